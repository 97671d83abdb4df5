
use std::io;

use thiserror::Error;

/// An error which can occur parsing, writing, or manipulating an EBML document.
///
/// Only failures that abort an operation are errors. A tree missing mandatory children or
/// carrying a stale checksum is still a valid tree; those conditions are reported by
/// `Master::check_mandatory`, `Master::find_all_missing_elements` and
/// `Master::verify_checksum`.
#[derive(Debug, Error)]
pub enum EbmlError {
    /// An error from the standard I/O library.
    #[error("EBML I/O error: {0}")]
    StdIo(#[from] io::Error),

    /// A coded size, identifier or leaf payload could not be decoded.
    #[error("malformed EBML encoding at offset {position}: {reason}")]
    MalformedEncoding {
        /// Offset in the source stream where the offending element or field started.
        position: u64,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// An EBML ID was out of range, reserved, or not encoded at its shortest width.
    #[error("EBML id out of range at offset {position}")]
    IdOutOfRange {
        /// Offset of the first byte of the identifier.
        position: u64,
    },

    /// The stream ended before an element's declared content was available.
    #[error("truncated EBML stream at offset {position}: expected {expected} bytes, got {available}")]
    TruncatedStream {
        /// Offset at which the short read started.
        position: u64,
        /// Number of bytes the element declared.
        expected: u64,
        /// Number of bytes actually available.
        available: u64,
    },

    /// A size can not be represented as a coded size (of the requested width).
    #[error("size {0} can not be coded")]
    SizeOutOfRange(u64),

    /// Rendering produced a different number of bytes than the element's size field declared.
    #[error("{name} declared {declared} bytes of content but rendered {actual}")]
    SizeMismatch {
        /// Name of the element type.
        name: &'static str,
        /// The size written to the head.
        declared: u64,
        /// The number of content bytes emitted.
        actual: u64,
    },

    /// The size field reserved by `write_head` is too narrow for the final content size.
    #[error("a {width} byte size field can not hold {size}")]
    PlaceholderTooNarrow {
        /// Width of the reserved size field.
        width: usize,
        /// The content size that had to be stored.
        size: u64,
    },

    /// The element's content was skipped while reading and has not been loaded since.
    #[error("{0} has not been loaded")]
    NotLoaded(&'static str),

    /// The element has never been read from or written to a stream.
    #[error("{0} has no stream position")]
    NoPosition(&'static str),

    /// A child index was past the end of the child list.
    #[error("index {index} out of range for {len} children")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of children.
        len: usize,
    },

    /// A child with the expected id is not of the expected element type.
    #[error("child {0} has an unexpected element type")]
    TypeMismatch(&'static str),
}

impl EbmlError {
    pub(crate) fn malformed(position: u64, reason: &'static str) -> Self {
        EbmlError::MalformedEncoding { position, reason }
    }

    /// Returns true if the error was caused by corrupt or truncated input rather than by the
    /// underlying stream or by misuse of the API.
    pub fn is_corrupt_stream(&self) -> bool {
        matches!(
            *self,
            EbmlError::MalformedEncoding { .. }
                | EbmlError::IdOutOfRange { .. }
                | EbmlError::TruncatedStream { .. }
        )
    }
}

/// A `Result` with error type `EbmlError`.
pub type EbmlResult<T> = Result<T, EbmlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_stream_classification() {
        assert!(EbmlError::malformed(3, "bad").is_corrupt_stream());
        assert!(EbmlError::IdOutOfRange { position: 0 }.is_corrupt_stream());
        assert!(!EbmlError::SizeOutOfRange(1).is_corrupt_stream());

        let io = EbmlError::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(!io.is_corrupt_stream());
        assert!(io.to_string().contains("boom"));
    }

    #[test]
    fn display_mentions_offsets() {
        let err = EbmlError::TruncatedStream {
            position: 12,
            expected: 8,
            available: 3,
        };
        assert!(err.to_string().contains("offset 12"));
    }
}
