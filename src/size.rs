
use std::cmp::{self, Ordering};
use std::io::Write;

use crate::error::{EbmlError, EbmlResult};
use crate::peek::PeekableReader;

// The reserved "unknown" values have these heads and tails of 0xFF.
const UNKNOWN_HEAD_VALUES: [u8; 8] = [0xFF, 0x7F, 0x3F, 0x1F, 0x0F, 0x07, 0x03, 0x01];
// The bitmask applied to the head to decode it as part of the real value.
const HEAD_MASK_VALUES: [u8; 8] = [0x7F, 0x3F, 0x1F, 0x0F, 0x07, 0x03, 0x01, 0x00];

/// The widest coded size, in bytes.
pub const MAX_WIDTH: usize = 8;

/// The largest value a coded size can hold; 2^56 - 1 is reserved for the unknown size.
pub const MAX_VALUE: u64 = (1 << 56) - 2;

/// An integer with a special value, representing an unknown size.
pub const UNKNOWN_SIZE: Size = Size {
    head: 0xFF,
    tail: [0; 7],
};

/// An unsigned variable-width integer, used by EBML to represent a size. It can also represent an
/// unknown size. The range of this integer is 0 to 2^56 - 2.
///
/// The unknown size is always equal to the unknown size, and each other value is equal to itself.
/// However, the unknown size can not be ordered with respect to known sizes.
#[derive(Debug, Clone, Copy)]
pub struct Size {
    head: u8,
    tail: [u8; 7], // the "length" of the array is head.leading_zeros(). MSB always at index 0.
}
impl Size {
    /// Attempts to read a `Size` from a data source.
    pub(crate) fn load(source: &mut PeekableReader) -> EbmlResult<Self> {
        let position = source.position();
        let head = source.read_u8()?;
        let width = Self::decoded_width(head)
            .ok_or_else(|| EbmlError::malformed(position, "coded size wider than 8 bytes"))?;

        let mut tail = [0u8; 7];
        source.read_exact(&mut tail[..width - 1])?;
        Ok(Size { head, tail })
    }

    /// Writes the coded representation to a data sink, returning the number of bytes written.
    pub fn write(&self, target: &mut dyn Write) -> EbmlResult<usize> {
        let width = self.get_width();
        target.write_all(&[self.head])?;
        target.write_all(&self.tail[..width - 1])?;
        Ok(width)
    }

    /// The coded representation, `get_width()` bytes long.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.get_width());
        bytes.push(self.head);
        bytes.extend_from_slice(&self.tail[..self.get_width() - 1]);
        bytes
    }

    /// The total width of a coded integer, given its first byte. Returns `None` for a zero byte,
    /// which would announce a width of more than 8 bytes.
    pub fn decoded_width(first_byte: u8) -> Option<usize> {
        if first_byte == 0 {
            None
        } else {
            Some(first_byte.leading_zeros() as usize + 1)
        }
    }

    /// Returns true if `bytes` is exactly one of the reserved unknown-size markers (all value bits
    /// set, at any width).
    pub fn is_unknown_marker(bytes: &[u8]) -> bool {
        match bytes.first().and_then(|b| Self::decoded_width(*b)) {
            Some(width) if width == bytes.len() => {
                bytes[0] == UNKNOWN_HEAD_VALUES[width - 1] && bytes[1..].iter().all(|b| *b == 0xFF)
            }
            _ => false,
        }
    }

    /// The smallest width able to hold `value`, or `None` if it is out of range.
    pub fn min_width(value: u64) -> Option<usize> {
        (1..=MAX_WIDTH).find(|width| value < (1u64 << (7 * width)) - 1)
    }

    /// Encodes `value` using at least `min_width` bytes (more if the value needs them). Fails if
    /// the value is out of range or the width exceeds 8.
    pub fn encode(value: u64, min_width: usize) -> EbmlResult<Self> {
        let width = Self::min_width(value)
            .map(|w| cmp::max(w, min_width))
            .filter(|w| *w <= MAX_WIDTH)
            .ok_or(EbmlError::SizeOutOfRange(value))?;
        Ok(Self::encode_at(value, width))
    }

    /// Encodes `value` at exactly `width` bytes, failing if it does not fit.
    pub fn encode_exact(value: u64, width: usize) -> EbmlResult<Self> {
        match Self::min_width(value) {
            Some(w) if w <= width && width <= MAX_WIDTH => Ok(Self::encode_at(value, width)),
            _ => Err(EbmlError::SizeOutOfRange(value)),
        }
    }

    /// The unknown-size marker at the given width (clamped to 1..=8).
    pub fn unknown(width: usize) -> Self {
        let width = cmp::min(cmp::max(width, 1), MAX_WIDTH);
        let mut tail = [0u8; 7];
        for byte in tail.iter_mut().take(width - 1) {
            *byte = 0xFF;
        }
        Size {
            head: UNKNOWN_HEAD_VALUES[width - 1],
            tail,
        }
    }

    // Callers guarantee 1 <= width <= 8 and value < 2^(7 * width) - 1.
    fn encode_at(value: u64, width: usize) -> Self {
        let mut tail = [0u8; 7];
        for (i, byte) in tail.iter_mut().take(width - 1).enumerate() {
            *byte = (value >> (8 * (width - 2 - i))) as u8;
        }
        let marker = 0x80u8 >> (width - 1);
        let top = if width == MAX_WIDTH {
            0
        } else {
            (value >> (8 * (width - 1))) as u8
        };
        Size {
            head: marker | top,
            tail,
        }
    }

    /// Retrieves the width of this integer (the number of bytes the representation requires).
    pub fn get_width(&self) -> usize {
        self.head.leading_zeros() as usize + 1
    }

    /// Returns true if this is one of the unknown-size markers.
    pub fn is_unknown(&self) -> bool {
        self.get_value().is_none()
    }

    /// Retrieves the value as a `u64`, returning `None` if this represents an unknown size.
    pub fn get_value(&self) -> Option<u64> {
        let tail_len = self.head.leading_zeros() as usize;

        if self.tail[..tail_len].iter().all(|x| *x == 0xFFu8)
            && self.head == UNKNOWN_HEAD_VALUES[tail_len]
        {
            return None;
        }

        let value = self.tail[..tail_len]
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
        Some(value | (u64::from(self.head & HEAD_MASK_VALUES[tail_len]) << (8 * tail_len)))
    }

    /// Converts the given value to a minimal-width `Size`, failing if the value is out of range
    /// (that is, greater than 2^56 - 2).
    pub fn from_u64(data: u64) -> Option<Self> {
        Self::encode(data, 1).ok()
    }
}
impl From<u8> for Size {
    fn from(data: u8) -> Self {
        Self::from(u32::from(data))
    }
}
impl From<u16> for Size {
    fn from(data: u16) -> Self {
        Self::from(u32::from(data))
    }
}
impl From<u32> for Size {
    fn from(data: u32) -> Self {
        let data = u64::from(data);
        // a u32 always fits in 5 bytes
        let width = (1..=5).find(|w| data < (1u64 << (7 * w)) - 1).unwrap_or(5);
        Self::encode_at(data, width)
    }
}
impl PartialOrd for Size {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.get_value(), other.get_value()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }
}
impl PartialEq for Size {
    fn eq(&self, other: &Self) -> bool {
        self.get_value() == other.get_value()
    }
}
impl Eq for Size {}
