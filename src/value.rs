
//! Values which can be stored in an EBML leaf element.
//!
//! Every value remembers the width it is stored with, so decoding and re-encoding a value yields
//! the original bytes even when the writer did not use the shortest representation.

use std::fmt;
use std::io::Write;

#[cfg(feature = "chrono")]
use chrono::{DateTime, TimeZone, Utc};

use crate::error::{EbmlError, EbmlResult};

const UNIX_TO_MILLENNIUM_NANOS: i64 = 978_307_200_000_000_000;
const UNIX_TO_MILLENNIUM_SECONDS: i64 = 978_307_200;

/// All EBML leaf values implement this trait.
pub trait EbmlValue: fmt::Debug + Clone + Default + PartialEq + 'static {
    /// The Rust representation of the value.
    type Repr;

    /// Gets the size of the encoded value in bytes.
    fn get_size(&self) -> u64;

    /// Copies this value to its Rust representation.
    fn to_repr(&self) -> Self::Repr;

    /// Decodes a value from the content bytes of an element. `position` is only used for error
    /// reporting.
    fn decode(data: &[u8], position: u64) -> EbmlResult<Self>;

    /// Writes exactly `get_size()` bytes.
    fn encode(&self, target: &mut dyn Write) -> EbmlResult<()>;
}

fn be_u64(data: &[u8]) -> u64 {
    data.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

fn be_i64(data: &[u8]) -> i64 {
    if data.is_empty() || data.len() > 8 {
        return 0;
    }
    // sign-extend from the top bit of the first byte
    let unsigned = be_u64(data);
    let shift = 64 - 8 * data.len() as u32;
    ((unsigned << shift) as i64) >> shift
}

/// A signed integer. The variant records how many bytes the value is stored with.
#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub enum IntValue {
    /// Zero, stored without any content bytes.
    #[default]
    Int0,
    /// Stored in 1 byte.
    Int1(i8),
    /// Stored in 2 bytes.
    Int2(i16),
    /// Stored in 3 bytes.
    Int3(i32),
    /// Stored in 4 bytes.
    Int4(i32),
    /// Stored in 5 bytes.
    Int5(i64),
    /// Stored in 6 bytes.
    Int6(i64),
    /// Stored in 7 bytes.
    Int7(i64),
    /// Stored in 8 bytes.
    Int8(i64),
}
impl IntValue {
    /// `value` stored in exactly `width` bytes, or `None` if it does not fit.
    pub fn with_width(value: i64, width: usize) -> Option<Self> {
        let fits = match width {
            0 => value == 0,
            1..=7 => {
                let bound = 1i64 << (8 * width - 1);
                (-bound..bound).contains(&value)
            }
            8 => true,
            _ => false,
        };
        if !fits {
            return None;
        }
        Some(match width {
            0 => IntValue::Int0,
            1 => IntValue::Int1(value as i8),
            2 => IntValue::Int2(value as i16),
            3 => IntValue::Int3(value as i32),
            4 => IntValue::Int4(value as i32),
            5 => IntValue::Int5(value),
            6 => IntValue::Int6(value),
            7 => IntValue::Int7(value),
            _ => IntValue::Int8(value),
        })
    }

    /// `value` in the fewest bytes able to hold it.
    pub fn minimal(value: i64) -> Self {
        (0..=8)
            .find_map(|width| Self::with_width(value, width))
            .unwrap_or(IntValue::Int8(value))
    }

    fn parts(&self) -> (usize, i64) {
        match *self {
            IntValue::Int0 => (0, 0),
            IntValue::Int1(x) => (1, i64::from(x)),
            IntValue::Int2(x) => (2, i64::from(x)),
            IntValue::Int3(x) => (3, i64::from(x)),
            IntValue::Int4(x) => (4, i64::from(x)),
            IntValue::Int5(x) => (5, x),
            IntValue::Int6(x) => (6, x),
            IntValue::Int7(x) => (7, x),
            IntValue::Int8(x) => (8, x),
        }
    }
}
impl EbmlValue for IntValue {
    type Repr = i64;

    fn get_size(&self) -> u64 {
        self.parts().0 as u64
    }

    fn to_repr(&self) -> i64 {
        self.parts().1
    }

    fn decode(data: &[u8], position: u64) -> EbmlResult<Self> {
        Self::with_width(be_i64(data), data.len())
            .ok_or_else(|| EbmlError::malformed(position, "signed integer wider than 8 bytes"))
    }

    fn encode(&self, target: &mut dyn Write) -> EbmlResult<()> {
        let (width, value) = self.parts();
        target.write_all(&value.to_be_bytes()[8 - width..])?;
        Ok(())
    }
}

/// An unsigned integer. The variant records how many bytes the value is stored with.
#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub enum UintValue {
    /// Zero, stored without any content bytes.
    #[default]
    Uint0,
    /// Stored in 1 byte.
    Uint1(u8),
    /// Stored in 2 bytes.
    Uint2(u16),
    /// Stored in 3 bytes.
    Uint3(u32),
    /// Stored in 4 bytes.
    Uint4(u32),
    /// Stored in 5 bytes.
    Uint5(u64),
    /// Stored in 6 bytes.
    Uint6(u64),
    /// Stored in 7 bytes.
    Uint7(u64),
    /// Stored in 8 bytes.
    Uint8(u64),
}
impl UintValue {
    /// `value` stored in exactly `width` bytes, or `None` if it does not fit.
    pub fn with_width(value: u64, width: usize) -> Option<Self> {
        let fits = match width {
            0 => value == 0,
            1..=7 => value < 1u64 << (8 * width),
            8 => true,
            _ => false,
        };
        if !fits {
            return None;
        }
        Some(match width {
            0 => UintValue::Uint0,
            1 => UintValue::Uint1(value as u8),
            2 => UintValue::Uint2(value as u16),
            3 => UintValue::Uint3(value as u32),
            4 => UintValue::Uint4(value as u32),
            5 => UintValue::Uint5(value),
            6 => UintValue::Uint6(value),
            7 => UintValue::Uint7(value),
            _ => UintValue::Uint8(value),
        })
    }

    /// `value` in the fewest bytes able to hold it.
    pub fn minimal(value: u64) -> Self {
        (0..=8)
            .find_map(|width| Self::with_width(value, width))
            .unwrap_or(UintValue::Uint8(value))
    }

    fn parts(&self) -> (usize, u64) {
        match *self {
            UintValue::Uint0 => (0, 0),
            UintValue::Uint1(x) => (1, u64::from(x)),
            UintValue::Uint2(x) => (2, u64::from(x)),
            UintValue::Uint3(x) => (3, u64::from(x)),
            UintValue::Uint4(x) => (4, u64::from(x)),
            UintValue::Uint5(x) => (5, x),
            UintValue::Uint6(x) => (6, x),
            UintValue::Uint7(x) => (7, x),
            UintValue::Uint8(x) => (8, x),
        }
    }
}
impl EbmlValue for UintValue {
    type Repr = u64;

    fn get_size(&self) -> u64 {
        self.parts().0 as u64
    }

    fn to_repr(&self) -> u64 {
        self.parts().1
    }

    fn decode(data: &[u8], position: u64) -> EbmlResult<Self> {
        Self::with_width(be_u64(data), data.len())
            .ok_or_else(|| EbmlError::malformed(position, "unsigned integer wider than 8 bytes"))
    }

    fn encode(&self, target: &mut dyn Write) -> EbmlResult<()> {
        let (width, value) = self.parts();
        target.write_all(&value.to_be_bytes()[8 - width..])?;
        Ok(())
    }
}

// Plain integers convert to their shortest encoding.
macro_rules! minimal_from {
    ($value:ident, $wide:ty: $($narrow:ty),*) => {$(
        impl From<$narrow> for $value {
            fn from(data: $narrow) -> Self {
                $value::minimal(<$wide>::from(data))
            }
        }
    )*};
}
minimal_from!(IntValue, i64: i8, i16, i32, i64);
minimal_from!(UintValue, u64: u8, u16, u32, u64);

/// A floating-point number, stored in 0, 4, 8 or 10 bytes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FloatValue {
    /// Zero, stored without any content bytes.
    #[default]
    Float0,
    /// Single precision.
    Float4(f32),
    /// Double precision.
    Float8(f64),
    /// x86 extended precision, kept as raw big-endian bytes since Rust has no `f80`.
    Float10([u8; 10]),
}
impl From<f32> for FloatValue {
    fn from(data: f32) -> Self {
        if data == 0.0 {
            FloatValue::Float0
        } else {
            FloatValue::Float4(data)
        }
    }
}
impl From<f64> for FloatValue {
    fn from(data: f64) -> Self {
        if data == 0.0 {
            FloatValue::Float0
        } else {
            FloatValue::Float8(data)
        }
    }
}

/// What `FloatValue::to_repr` returns: an `f64`, or the raw bytes of an extended precision value.
#[derive(Debug, PartialEq, Clone)]
pub enum FloatValueRepr {
    /// Any 0, 4 or 8 byte value.
    F64(f64),
    /// A 10 byte value.
    F80([u8; 10]),
}
impl EbmlValue for FloatValue {
    type Repr = FloatValueRepr;

    fn get_size(&self) -> u64 {
        match *self {
            FloatValue::Float0 => 0,
            FloatValue::Float4(_) => 4,
            FloatValue::Float8(_) => 8,
            FloatValue::Float10(_) => 10,
        }
    }

    fn to_repr(&self) -> FloatValueRepr {
        match *self {
            FloatValue::Float0 => FloatValueRepr::F64(0.0),
            FloatValue::Float4(x) => FloatValueRepr::F64(f64::from(x)),
            FloatValue::Float8(x) => FloatValueRepr::F64(x),
            FloatValue::Float10(raw) => FloatValueRepr::F80(raw),
        }
    }

    fn decode(data: &[u8], position: u64) -> EbmlResult<Self> {
        match data.len() {
            0 => Ok(FloatValue::Float0),
            4 => Ok(FloatValue::Float4(f32::from_bits(be_u64(data) as u32))),
            8 => Ok(FloatValue::Float8(f64::from_bits(be_u64(data)))),
            10 => {
                let mut raw = [0u8; 10];
                raw.copy_from_slice(data);
                Ok(FloatValue::Float10(raw))
            }
            _ => Err(EbmlError::malformed(position, "float must be 0, 4, 8 or 10 bytes")),
        }
    }

    fn encode(&self, target: &mut dyn Write) -> EbmlResult<()> {
        match *self {
            FloatValue::Float0 => {}
            FloatValue::Float4(x) => target.write_all(&x.to_bits().to_be_bytes())?,
            FloatValue::Float8(x) => target.write_all(&x.to_bits().to_be_bytes())?,
            FloatValue::Float10(ref raw) => target.write_all(raw)?,
        }
        Ok(())
    }
}

/// A UTF-8 encoded Unicode string.
#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct StringValue {
    data: String,
    padding_len: usize,
}
impl From<String> for StringValue {
    fn from(data: String) -> Self {
        StringValue {
            data,
            padding_len: 0,
        }
    }
}
impl<'a> From<&'a str> for StringValue {
    fn from(data: &'a str) -> Self {
        data.to_string().into()
    }
}
impl StringValue {
    /// Creates a string value with some amount of 0-padding appended to it. The padding is
    /// reflected in the size of the value but not the representation.
    pub fn with_padding(data: String, padding_len: usize) -> Self {
        StringValue { data, padding_len }
    }

    /// Borrows the string without its padding.
    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// The number of zero bytes written after the string.
    pub fn padding_len(&self) -> usize {
        self.padding_len
    }
}
impl EbmlValue for StringValue {
    type Repr = String;

    fn get_size(&self) -> u64 {
        (self.data.len() + self.padding_len) as u64
    }

    fn to_repr(&self) -> String {
        self.data.clone()
    }

    fn decode(data: &[u8], position: u64) -> EbmlResult<Self> {
        // everything from the first zero byte on is padding
        let len = data.iter().position(|b| *b == 0).unwrap_or(data.len());
        let text = std::str::from_utf8(&data[..len])
            .map_err(|_| EbmlError::malformed(position, "string is not valid UTF-8"))?;
        Ok(StringValue::with_padding(text.to_string(), data.len() - len))
    }

    fn encode(&self, target: &mut dyn Write) -> EbmlResult<()> {
        target.write_all(self.data.as_bytes())?;
        target.write_all(&vec![0u8; self.padding_len])?;
        Ok(())
    }
}

/// A timestamp with nanosecond precision.
#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct DateValue {
    nanos_since_millennium: i64,
}
#[cfg(feature = "chrono")]
impl<Tz: TimeZone> From<DateTime<Tz>> for DateValue {
    /// Dates outside of roughly 1709 to 2293 saturate.
    fn from(data: DateTime<Tz>) -> Self {
        let nanos = data
            .with_timezone(&Utc)
            .timestamp_nanos_opt()
            .unwrap_or(if data.timestamp() < 0 { i64::MIN } else { i64::MAX });
        DateValue {
            nanos_since_millennium: nanos.saturating_sub(UNIX_TO_MILLENNIUM_NANOS),
        }
    }
}
impl DateValue {
    /// Creates a `DateValue` from nanoseconds since 2001-01-01T00:00:00 UTC, the EBML epoch.
    pub fn from_nanos_since_millennium(nanos_since_millennium: i64) -> Self {
        DateValue {
            nanos_since_millennium,
        }
    }

    /// Creates a `DateValue` given the number of milliseconds since the Unix epoch, returning
    /// `None` if the value would over/underflow.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        millis
            .checked_mul(1_000_000i64)
            .and_then(|x| x.checked_sub(UNIX_TO_MILLENNIUM_NANOS))
            .map(|nanos_since_millennium| DateValue {
                nanos_since_millennium,
            })
    }

    /// Creates a `DateValue` given the number of seconds since the Unix epoch, returning
    /// `None` if the value would over/underflow.
    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        seconds
            .checked_sub(UNIX_TO_MILLENNIUM_SECONDS)
            .and_then(|x| x.checked_mul(1_000_000_000i64))
            .map(|nanos_since_millennium| DateValue {
                nanos_since_millennium,
            })
    }

    /// Nanoseconds since the EBML epoch, as stored in the document.
    pub fn nanos_since_millennium(&self) -> i64 {
        self.nanos_since_millennium
    }
}
impl EbmlValue for DateValue {
    #[cfg(feature = "chrono")]
    type Repr = DateTime<Utc>;
    #[cfg(not(feature = "chrono"))]
    type Repr = i64;

    fn get_size(&self) -> u64 {
        8
    }

    #[cfg(feature = "chrono")]
    fn to_repr(&self) -> Self::Repr {
        Utc.timestamp_nanos(
            self.nanos_since_millennium
                .saturating_add(UNIX_TO_MILLENNIUM_NANOS),
        )
    }

    /// Converts this to the number of nanoseconds since the Unix epoch, saturating at the ends of
    /// the `i64` range.
    #[cfg(not(feature = "chrono"))]
    fn to_repr(&self) -> Self::Repr {
        self.nanos_since_millennium
            .saturating_add(UNIX_TO_MILLENNIUM_NANOS)
    }

    fn decode(data: &[u8], position: u64) -> EbmlResult<Self> {
        match data.len() {
            0 | 8 => Ok(DateValue {
                nanos_since_millennium: be_i64(data),
            }),
            _ => Err(EbmlError::malformed(position, "date must be 0 or 8 bytes")),
        }
    }

    fn encode(&self, target: &mut dyn Write) -> EbmlResult<()> {
        target.write_all(&self.nanos_since_millennium.to_be_bytes())?;
        Ok(())
    }
}

/// Arbitrary binary data.
#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct BinaryValue {
    data: Vec<u8>,
}
impl<'a> From<&'a [u8]> for BinaryValue {
    fn from(data: &'a [u8]) -> Self {
        BinaryValue {
            data: data.to_vec(),
        }
    }
}
impl From<Vec<u8>> for BinaryValue {
    fn from(data: Vec<u8>) -> Self {
        BinaryValue { data }
    }
}
impl BinaryValue {
    /// Borrows the data.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutably borrows the data. The size of the owning element must be updated before it is
    /// rendered again.
    pub fn as_mut_vec(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}
impl EbmlValue for BinaryValue {
    type Repr = Vec<u8>;

    fn get_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn to_repr(&self) -> Self::Repr {
        self.data.clone()
    }

    fn decode(data: &[u8], _position: u64) -> EbmlResult<Self> {
        Ok(data.into())
    }

    fn encode(&self, target: &mut dyn Write) -> EbmlResult<()> {
        target.write_all(&self.data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<V: EbmlValue>(value: &V) -> Vec<u8> {
        let mut out = Vec::new();
        value.encode(&mut out).unwrap();
        assert_eq!(value.get_size(), out.len() as u64);
        out
    }

    #[test]
    fn unsigned_widths() {
        let x: UintValue = 0u8.into();
        assert_eq!(0, x.get_size());
        assert_eq!(0, x.to_repr());

        let x: UintValue = 256u16.into();
        assert_eq!(2, x.get_size());
        assert_eq!(vec![0x01, 0x00], encoded(&x));

        let x: UintValue = 16_777_216u32.into();
        assert_eq!(4, x.get_size());

        let x: UintValue = 72_057_594_037_927_936u64.into();
        assert_eq!(8, x.get_size());
        assert_eq!(72_057_594_037_927_936, x.to_repr());
    }

    #[test]
    fn signed_widths() {
        let x: IntValue = (-1i8).into();
        assert_eq!(1, x.get_size());
        assert_eq!(vec![0xFF], encoded(&x));

        let x: IntValue = (-129i16).into();
        assert_eq!(2, x.get_size());
        assert_eq!(-129, x.to_repr());

        let x: IntValue = (8_388_608i32).into();
        assert_eq!(4, x.get_size());

        let x: IntValue = (-140_737_488_355_329i64).into();
        assert_eq!(7, x.get_size());
        assert_eq!(-140_737_488_355_329, x.to_repr());
    }

    #[test]
    fn integers_keep_their_stored_width() {
        let x = UintValue::decode(&[0x00, 0x01], 0).unwrap();
        assert_eq!(UintValue::Uint2(1), x);
        assert_eq!(vec![0x00, 0x01], encoded(&x));

        let x = IntValue::decode(&[0xFF, 0xFE, 0x00], 0).unwrap();
        assert_eq!(IntValue::Int3(-512), x);
        assert_eq!(vec![0xFF, 0xFE, 0x00], encoded(&x));

        assert!(UintValue::decode(&[0; 9], 7).unwrap_err().is_corrupt_stream());
    }

    #[test]
    fn floats() {
        let x: FloatValue = 0.0f32.into();
        assert_eq!(0, x.get_size());
        assert_eq!(FloatValueRepr::F64(0.0), x.to_repr());

        let x: FloatValue = 1.5f64.into();
        let bytes = encoded(&x);
        assert_eq!(8, bytes.len());
        assert_eq!(x, FloatValue::decode(&bytes, 0).unwrap());

        let x = FloatValue::decode(&[0x3F, 0xC0, 0x00, 0x00], 0).unwrap();
        assert_eq!(FloatValueRepr::F64(1.5), x.to_repr());

        assert!(FloatValue::decode(&[0; 3], 0).is_err());
    }

    #[test]
    fn strings() {
        let x: StringValue = "abcd".into();
        assert_eq!(4, x.get_size());
        assert_eq!("abcd".to_string(), x.to_repr());

        let x = StringValue::with_padding("asdfg".into(), 100);
        assert_eq!(105, x.get_size());
        assert_eq!("asdfg".to_string(), x.to_repr());

        let x = StringValue::decode(b"webm\0\0\0", 0).unwrap();
        assert_eq!("webm", x.as_str());
        assert_eq!(3, x.padding_len());
        assert_eq!(b"webm\0\0\0".to_vec(), encoded(&x));

        assert!(StringValue::decode(&[0xC3, 0x28], 0).is_err());
    }

    #[test]
    fn binary() {
        let x: BinaryValue = vec![0x01, 0x02][..].into();
        assert_eq!(2, x.get_size());
        assert_eq!(vec![0x01, 0x02], x.to_repr());
    }

    #[test]
    fn dates() {
        let x = DateValue::from_unix_seconds(UNIX_TO_MILLENNIUM_SECONDS + 1).unwrap();
        assert_eq!(1_000_000_000, x.nanos_since_millennium());
        assert_eq!(
            x,
            DateValue::from_unix_millis((UNIX_TO_MILLENNIUM_SECONDS + 1) * 1000).unwrap()
        );

        let bytes = encoded(&x);
        assert_eq!(vec![0, 0, 0, 0, 0x3B, 0x9A, 0xCA, 0x00], bytes);
        assert_eq!(x, DateValue::decode(&bytes, 0).unwrap());
        assert_eq!(
            -1,
            DateValue::decode(&[0xFF; 8], 0)
                .unwrap()
                .nanos_since_millennium()
        );
    }

    #[cfg(not(feature = "chrono"))]
    #[test]
    fn date_repr_is_unix_nanos() {
        let x = DateValue::from_nanos_since_millennium(5);
        assert_eq!(UNIX_TO_MILLENNIUM_NANOS + 5, x.to_repr());
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn from_datetime() {
        let sample = Utc.timestamp_opt(1_492_662_000, 0).unwrap();
        let x: DateValue = sample.into();
        assert_eq!(8, x.get_size());
        assert_eq!(sample, x.to_repr());
    }
}
