
use std::fmt;
use std::io::{self, Read};

use crate::error::{EbmlError, EbmlResult};

/// A sequential byte source that tracks its offset and can peek one byte ahead, which is enough
/// to tell a clean end of stream apart from a truncated element.
pub struct PeekableReader<'a> {
    source: Box<dyn Read + 'a>,
    peeked: Option<u8>,
    position: u64,
}
impl<'a> PeekableReader<'a> {
    /// Creates a new `PeekableReader` from any `Read` source, counting offsets from zero.
    pub fn new<R: Read + 'a>(source: R) -> Self {
        Self::at_offset(source, 0)
    }

    /// Creates a new `PeekableReader` whose first byte is at `position` in the underlying stream.
    /// Use this after seeking a source to the start of an element.
    pub fn at_offset<R: Read + 'a>(source: R, position: u64) -> Self {
        PeekableReader {
            source: Box::new(source),
            peeked: None,
            position,
        }
    }

    /// The offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// "Peeks" at the next byte. Repeated calls return the same value until a byte is consumed.
    /// Returns `None` at the end of the stream.
    pub fn peek(&mut self) -> io::Result<Option<u8>> {
        if self.peeked.is_none() {
            let mut byte = [0u8];
            loop {
                match self.source.read(&mut byte) {
                    Ok(0) => return Ok(None),
                    Ok(_) => {
                        self.peeked = Some(byte[0]);
                        break;
                    }
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(self.peeked)
    }

    /// Returns true if no more bytes can be read.
    pub fn at_end(&mut self) -> io::Result<bool> {
        self.peek().map(|b| b.is_none())
    }

    /// Reads a single byte, failing with `TruncatedStream` at the end of the stream.
    pub fn read_u8(&mut self) -> EbmlResult<u8> {
        match self.peek()? {
            Some(byte) => {
                self.peeked = None;
                self.position += 1;
                Ok(byte)
            }
            None => Err(EbmlError::TruncatedStream {
                position: self.position,
                expected: 1,
                available: 0,
            }),
        }
    }

    /// Fills `buf` completely, failing with `TruncatedStream` if the stream ends first.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> EbmlResult<()> {
        let start = self.position;
        let mut filled = 0;
        if let Some(byte) = self.peeked.take() {
            if buf.is_empty() {
                self.peeked = Some(byte);
                return Ok(());
            }
            buf[0] = byte;
            filled = 1;
        }
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.position = start + filled as u64;
                    return Err(EbmlError::TruncatedStream {
                        position: start,
                        expected: buf.len() as u64,
                        available: filled as u64,
                    });
                }
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.position = start + filled as u64;
        Ok(())
    }

    /// Reads exactly `len` bytes into a new buffer. The buffer grows as data arrives, so a bogus
    /// size in a corrupt file fails with `TruncatedStream` instead of allocating it up front.
    pub fn read_vec(&mut self, len: u64) -> EbmlResult<Vec<u8>> {
        let start = self.position;
        let mut data = Vec::new();
        if len == 0 {
            return Ok(data);
        }
        if let Some(byte) = self.peeked.take() {
            data.push(byte);
        }
        let remaining = len - data.len() as u64;
        self.source.by_ref().take(remaining).read_to_end(&mut data)?;
        self.position = start + data.len() as u64;
        if (data.len() as u64) < len {
            return Err(EbmlError::TruncatedStream {
                position: start,
                expected: len,
                available: data.len() as u64,
            });
        }
        Ok(data)
    }

    /// Advances the position of the reader by the specified amount without keeping the data.
    pub fn skip(&mut self, amount: u64) -> EbmlResult<()> {
        let start = self.position;
        if amount == 0 {
            return Ok(());
        }
        let mut skipped = 0u64;
        if self.peeked.take().is_some() {
            skipped = 1;
        }
        skipped += io::copy(&mut self.source.by_ref().take(amount - skipped), &mut io::sink())?;
        self.position = start + skipped;
        if skipped < amount {
            return Err(EbmlError::TruncatedStream {
                position: start,
                expected: amount,
                available: skipped,
            });
        }
        Ok(())
    }
}
impl<'a> fmt::Debug for PeekableReader<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PeekableReader")
            .field("position", &self.position)
            .field("peeked", &self.peeked)
            .finish()
    }
}
