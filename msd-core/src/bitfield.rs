//! Bit-field pack/extract helpers
//!
//! Every register, DSA tag and table-dump record in this crate family is a
//! collection of N-bit fields at fixed bit offsets inside 16- or 32-bit words.
//! [`BitField`] describes one such field; [`WordReader`] and [`WordWriter`]
//! give bounds-checked, big-endian word access over byte buffers so that
//! record decoders never index raw bytes directly.

use crate::{Error, Result};

/// An N-bit field at a fixed bit offset inside a 32-bit word
///
/// Bit 0 is the least significant bit. The same descriptor works for 16-bit
/// registers as long as `offset + len <= 16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitField {
    offset: u8,
    len: u8,
}

impl BitField {
    /// Create a field descriptor.
    ///
    /// Usable in `const` register tables; an invalid descriptor fails at
    /// compile time there.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero or the field does not fit in 32 bits.
    pub const fn new(offset: u8, len: u8) -> Self {
        assert!(len >= 1 && len <= 32, "bit field length must be 1..=32");
        assert!(
            offset as u32 + len as u32 <= 32,
            "bit field must fit in a 32-bit word"
        );
        Self { offset, len }
    }

    /// Create a field descriptor, returning an error for invalid geometry
    pub fn try_new(offset: u8, len: u8) -> Result<Self> {
        if len == 0 || len > 32 || offset as u32 + len as u32 > 32 {
            return Err(Error::bad_param(
                "bit_field",
                format!("offset {} / length {} does not fit in 32 bits", offset, len),
            ));
        }
        Ok(Self { offset, len })
    }

    /// Single-bit field
    pub const fn bit(offset: u8) -> Self {
        Self::new(offset, 1)
    }

    /// Bit offset of the least significant bit
    pub const fn offset(self) -> u8 {
        self.offset
    }

    /// Width in bits
    pub const fn len(self) -> u8 {
        self.len
    }

    /// Largest value the field can hold
    pub const fn max_value(self) -> u32 {
        if self.len == 32 {
            u32::MAX
        } else {
            (1u32 << self.len) - 1
        }
    }

    /// Mask of the field's bits in place
    pub const fn mask(self) -> u32 {
        self.max_value() << self.offset
    }

    /// Whether the field lies entirely within the low 16 bits
    pub const fn fits_u16(self) -> bool {
        self.offset as u32 + self.len as u32 <= 16
    }

    /// Extract the field from a 32-bit word
    pub const fn extract(self, word: u32) -> u32 {
        (word >> self.offset) & self.max_value()
    }

    /// Replace the field inside `word` with `value`
    pub fn insert(self, word: u32, value: u32) -> Result<u32> {
        if value > self.max_value() {
            return Err(Error::bad_param(
                "value",
                format!(
                    "{:#x} does not fit in {} bit(s) at offset {}",
                    value, self.len, self.offset
                ),
            ));
        }
        Ok((word & !self.mask()) | (value << self.offset))
    }

    /// Place `value` in an otherwise zero word
    pub fn pack(self, value: u32) -> Result<u32> {
        self.insert(0, value)
    }

    /// Extract the field from a 16-bit word
    pub const fn extract_u16(self, word: u16) -> u16 {
        self.extract(word as u32) as u16
    }

    /// Replace the field inside a 16-bit word
    pub fn insert_u16(self, word: u16, value: u16) -> Result<u16> {
        if !self.fits_u16() {
            return Err(Error::bad_param(
                "bit_field",
                format!("offset {} / length {} exceeds 16 bits", self.offset, self.len),
            ));
        }
        Ok(self.insert(word as u32, value as u32)? as u16)
    }

    /// Place `value` in an otherwise zero 16-bit word
    pub fn pack_u16(self, value: u16) -> Result<u16> {
        self.insert_u16(0, value)
    }
}

/// Bounds-checked big-endian 16-bit word reader over a byte buffer
#[derive(Debug, Clone, Copy)]
pub struct WordReader<'a> {
    data: &'a [u8],
}

impl<'a> WordReader<'a> {
    /// Wrap a byte slice
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Number of whole 16-bit words available
    pub fn len_words(&self) -> usize {
        self.data.len() / 2
    }

    /// Read word `index`
    pub fn word(&self, index: usize) -> Result<u16> {
        let start = index * 2;
        match self.data.get(start..start + 2) {
            Some(b) => Ok(u16::from_be_bytes([b[0], b[1]])),
            None => Err(Error::parsing(format!(
                "word {} out of range ({} bytes available)",
                index,
                self.data.len()
            ))),
        }
    }

    /// Read two consecutive words as a big-endian 32-bit value
    pub fn dword(&self, index: usize) -> Result<u32> {
        let hi = self.word(index)? as u32;
        let lo = self.word(index + 1)? as u32;
        Ok((hi << 16) | lo)
    }

    /// Extract a field from word `index`
    pub fn field(&self, index: usize, field: BitField) -> Result<u16> {
        Ok(field.extract_u16(self.word(index)?))
    }

    /// Extract a field from word `index` and narrow it to `u8`
    pub fn field_u8(&self, index: usize, field: BitField) -> Result<u8> {
        Ok(self.field(index, field)? as u8)
    }

    /// Read a single bit of word `index`
    pub fn flag(&self, index: usize, bit: u8) -> Result<bool> {
        Ok(self.field(index, BitField::bit(bit))? != 0)
    }
}

/// Big-endian 16-bit word builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordWriter {
    words: Vec<u16>,
}

impl WordWriter {
    /// Create a writer holding `len` zero words
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len],
        }
    }

    fn slot(&mut self, index: usize) -> Result<&mut u16> {
        let len = self.words.len();
        self.words.get_mut(index).ok_or_else(|| {
            Error::bad_param("word_index", format!("{} out of range ({} words)", index, len))
        })
    }

    /// Overwrite word `index`
    pub fn set(&mut self, index: usize, value: u16) -> Result<()> {
        *self.slot(index)? = value;
        Ok(())
    }

    /// Insert `value` into a field of word `index`
    pub fn set_field(&mut self, index: usize, field: BitField, value: u16) -> Result<()> {
        let slot = self.slot(index)?;
        *slot = field.insert_u16(*slot, value)?;
        Ok(())
    }

    /// Set or clear a single bit of word `index`
    pub fn set_flag(&mut self, index: usize, bit: u8, value: bool) -> Result<()> {
        self.set_field(index, BitField::bit(bit), value as u16)
    }

    /// Words written so far
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Serialize as big-endian bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_geometries() {
        for len in 1..=32u8 {
            for offset in 0..=(32 - len) {
                let field = BitField::new(offset, len);
                for value in [0, 1, field.max_value() / 2, field.max_value()] {
                    let packed = field.pack(value).unwrap();
                    assert_eq!(field.extract(packed), value, "offset {} len {}", offset, len);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_u16() {
        for len in 1..=16u8 {
            for offset in 0..=(16 - len) {
                let field = BitField::new(offset, len);
                let value = field.max_value() as u16;
                let packed = field.pack_u16(value).unwrap();
                assert_eq!(field.extract_u16(packed), value);
            }
        }
    }

    #[test]
    fn test_insert_preserves_neighbours() {
        let field = BitField::new(4, 4);
        let word = field.insert(0xFFFF_FFFF, 0x5).unwrap();
        assert_eq!(word, 0xFFFF_FF5F);
    }

    #[test]
    fn test_value_too_wide() {
        let field = BitField::new(0, 3);
        assert!(field.pack(8).is_err());
        assert!(BitField::new(10, 8).pack_u16(1).is_err());
    }

    #[test]
    fn test_try_new_rejects_bad_geometry() {
        assert!(BitField::try_new(0, 0).is_err());
        assert!(BitField::try_new(30, 3).is_err());
        assert!(BitField::try_new(0, 32).is_ok());
    }

    #[test]
    fn test_word_reader() {
        let data = [0x12, 0x34, 0xAB, 0xCD, 0xFF];
        let reader = WordReader::new(&data);
        assert_eq!(reader.len_words(), 2);
        assert_eq!(reader.word(0).unwrap(), 0x1234);
        assert_eq!(reader.dword(0).unwrap(), 0x1234_ABCD);
        assert_eq!(reader.field(1, BitField::new(8, 8)).unwrap(), 0xAB);
        assert!(reader.flag(1, 0).unwrap());
        assert!(reader.word(2).is_err());
    }

    #[test]
    fn test_word_writer() {
        let mut writer = WordWriter::new(2);
        writer.set(0, 0x1234).unwrap();
        writer.set_field(1, BitField::new(4, 4), 0xA).unwrap();
        writer.set_flag(1, 15, true).unwrap();
        assert_eq!(writer.to_bytes(), vec![0x12, 0x34, 0x80, 0xA0]);
        assert!(writer.set(2, 0).is_err());
    }
}
