
use std::fmt;
use std::io::Write;

use crate::error::{EbmlError, EbmlResult};
use crate::peek::PeekableReader;
use crate::size::Size;

/// An EBML ID. These are nearly identical to Sizes, except there are additional reserved values
/// and different maximum widths. The ID is kept in its encoded form (marker bit included), which
/// is how element IDs are usually written down, e.g. `0x1A45DFA3` for the EBML header.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Id {
    encoded: u32,
}
impl Id {
    /// Attempts to read an `Id` from a data source.
    pub(crate) fn load(source: &mut PeekableReader) -> EbmlResult<Self> {
        let position = source.position();
        let first = source.read_u8()?;
        let width = match Size::decoded_width(first) {
            Some(width) if width <= 4 => width,
            _ => return Err(EbmlError::IdOutOfRange { position }),
        };

        let mut rest = [0u8; 3];
        source.read_exact(&mut rest[..width - 1])?;
        let encoded = rest[..width - 1]
            .iter()
            .fold(u32::from(first), |acc, byte| (acc << 8) | u32::from(*byte));

        Self::from_encoded(encoded).ok_or(EbmlError::IdOutOfRange { position })
    }

    /// Attempts to write an `Id` to a data sink, returning the number of bytes written.
    pub fn write(&self, target: &mut dyn Write) -> EbmlResult<usize> {
        let width = self.get_width();
        target.write_all(&self.encoded.to_be_bytes()[4 - width..])?;
        Ok(width)
    }

    /// Constructs an EBML ID from its encoded representation, returning `None` if it is not a
    /// valid ID (reserved, or not written at its shortest width).
    pub const fn from_encoded(data: u32) -> Option<Self> {
        if data >= 0x0000_0080 && data <= 0x0000_00FF {
            Self::new_class_a((data & 0x7F) as u8)
        } else if data >= 0x0000_4000 && data <= 0x0000_7FFF {
            Self::new_class_b((data & 0x3FFF) as u16)
        } else if data >= 0x0020_0000 && data <= 0x003F_FFFF {
            Self::new_class_c(data & 0x1F_FFFF)
        } else if data >= 0x1000_0000 && data <= 0x1FFF_FFFF {
            Self::new_class_d(data & 0x0FFF_FFFF)
        } else {
            None
        }
    }

    /// Constructs an EBML Class A ID (width 1) from its literal value, returning `None` if the
    /// value is not in range for the ID. The range of valid values is 0x01 to 0x7E inclusive, so
    /// there are 126 possible Class A IDs.
    ///
    /// This does _not_ take the 'encoded' form of the ID.
    pub const fn new_class_a(data: u8) -> Option<Self> {
        if data == 0u8 || data >= 0x7Fu8 {
            None
        } else {
            Some(Id {
                encoded: 0x80 | data as u32,
            })
        }
    }

    /// Constructs an EBML Class B ID (width 2) from its literal value, returning `None` if the
    /// value is not in range for the ID. The range of valid values is 0x7F to 0x3FFE inclusive.
    pub const fn new_class_b(data: u16) -> Option<Self> {
        if data < 0x7Fu16 || data >= 0x3FFFu16 {
            None
        } else {
            Some(Id {
                encoded: 0x4000 | data as u32,
            })
        }
    }

    /// Constructs an EBML Class C ID (width 3) from its literal value, returning `None` if the
    /// value is not in range for the ID. The range of valid values is 0x3FFF to 0x1F_FFFE
    /// inclusive.
    pub const fn new_class_c(data: u32) -> Option<Self> {
        if data < 0x3FFF || data >= 0x1F_FFFF {
            None
        } else {
            Some(Id {
                encoded: 0x20_0000 | data,
            })
        }
    }

    /// Constructs an EBML Class D ID (width 4) from its literal value, returning `None` if the
    /// value is not in range for the ID. The range of valid values is 0x001F_FFFF to 0x0FFF_FFFE
    /// inclusive.
    pub const fn new_class_d(data: u32) -> Option<Self> {
        if data < 0x1F_FFFF || data >= 0x0FFF_FFFF {
            None
        } else {
            Some(Id {
                encoded: 0x1000_0000 | data,
            })
        }
    }

    /// The encoded representation, e.g. `0xEC` for Void.
    pub const fn get_encoded(&self) -> u32 {
        self.encoded
    }

    /// Gets the width of the ID. A width of 1 means the ID is Class A, width of 2 means Class B,
    /// etc.
    pub const fn get_width(&self) -> usize {
        if self.encoded > 0x00FF_FFFF {
            4
        } else if self.encoded > 0xFFFF {
            3
        } else if self.encoded > 0xFF {
            2
        } else {
            1
        }
    }
}
impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:0width$X}]", self.encoded, width = self.get_width() * 2)
    }
}
