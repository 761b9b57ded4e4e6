//! Bounds-checked cursor over a byte slice.

use crate::ParseError;

/// A forward-only reader that refuses to read past the end of its buffer.
///
/// Each read names the field it is taking so that a short buffer reports
/// which part of the layout was missing.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Take exactly `len` bytes.
    pub fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], ParseError> {
        if self.remaining() < len {
            return Err(ParseError::Truncated {
                field,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    /// Take a fixed-size array.
    pub fn take_array<const N: usize>(
        &mut self,
        field: &'static str,
    ) -> Result<[u8; N], ParseError> {
        let slice = self.take(N, field)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Take a single byte.
    pub fn u8(&mut self, field: &'static str) -> Result<u8, ParseError> {
        Ok(self.take_array::<1>(field)?[0])
    }

    /// Take a big-endian `u16`.
    pub fn u16_be(&mut self, field: &'static str) -> Result<u16, ParseError> {
        Ok(u16::from_be_bytes(self.take_array(field)?))
    }

    /// Take a big-endian `u32`.
    pub fn u32_be(&mut self, field: &'static str) -> Result<u32, ParseError> {
        Ok(u32::from_be_bytes(self.take_array(field)?))
    }

    /// Take everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.position..];
        self.position = self.bytes.len();
        slice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_reads_big_endian_integers() {
        let mut reader = ByteReader::new(&[0x00, 0x2a, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(reader.u16_be("a").unwrap(), 42);
        assert_eq!(reader.u32_be("b").unwrap(), 256);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn it_reports_the_field_that_ran_short() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        reader.u8("first").unwrap();
        assert_eq!(
            reader.u32_be("counter"),
            Err(ParseError::Truncated {
                field: "counter",
                needed: 4,
                available: 2
            })
        );
        // A failed read does not advance the cursor.
        assert_eq!(reader.position(), 1);
    }
}
