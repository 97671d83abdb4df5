
//! Checksums over the rendered content of a master element.

/// A checksum algorithm over a byte string.
pub trait Checksum {
    /// Computes the checksum of `data`.
    fn compute(&self, data: &[u8]) -> u32;

    /// Returns true if `data` matches `expected`.
    fn verify(&self, data: &[u8], expected: u32) -> bool {
        self.compute(data) == expected
    }
}

const POLYNOMIAL: u32 = 0xEDB8_8320;

const fn make_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static TABLE: [u32; 256] = make_table();

/// The IEEE 802.3 CRC-32 used by EBML `CRC-32` elements. The value is stored little-endian in
/// the element.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32;
impl Crc32 {
    /// Continues a running checksum with more data. Start from 0.
    pub fn update(crc: u32, data: &[u8]) -> u32 {
        !data.iter().fold(!crc, |crc, byte| {
            TABLE[((crc ^ u32::from(*byte)) & 0xFF) as usize] ^ (crc >> 8)
        })
    }
}
impl Checksum for Crc32 {
    fn compute(&self, data: &[u8]) -> u32 {
        Self::update(0, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(0xCBF4_3926, Crc32.compute(b"123456789"));
        assert_eq!(0, Crc32.compute(&[]));
    }

    #[test]
    fn incremental() {
        let whole = Crc32.compute(b"hello world");
        let split = Crc32::update(Crc32::update(0, b"hello "), b"world");
        assert_eq!(whole, split);
        assert!(Crc32.verify(b"hello world", whole));
        assert!(!Crc32.verify(b"hello world!", whole));
    }
}
