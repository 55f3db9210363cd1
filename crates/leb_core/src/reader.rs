use crate::error::{ParseError, ValidationError};

/// Little-endian reads at absolute offsets into a fully materialized buffer.
///
/// Offsets in the format are absolute within the file, so every read takes an
/// explicit position instead of advancing a cursor.
#[derive(Debug, Clone, Copy)]
pub struct LittleEndianReader<'a> {
    bytes: &'a [u8],
}

impl<'a> LittleEndianReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn read_bytes(&self, offset: usize, n: usize) -> Result<&'a [u8], ParseError> {
        let end = offset
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ParseError::TruncatedBuffer {
                offset,
                needed: n,
                len: self.bytes.len(),
            })?;
        Ok(&self.bytes[offset..end])
    }

    fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], ParseError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(offset, N)?);
        Ok(buf)
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, ParseError> {
        Ok(self.read_array::<1>(offset)?[0])
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16, ParseError> {
        Ok(u16::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32, ParseError> {
        Ok(u32::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_raw4(&self, offset: usize) -> Result<[u8; 4], ParseError> {
        self.read_array(offset)
    }

    pub fn read_u64(&self, offset: usize) -> Result<u64, ParseError> {
        Ok(u64::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_f32(&self, offset: usize) -> Result<f32, ParseError> {
        Ok(f32::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_f32_array<const N: usize>(&self, offset: usize) -> Result<[f32; N], ParseError> {
        let mut result = [0f32; N];
        for (i, item) in result.iter_mut().enumerate() {
            *item = self.read_f32(offset + i * 4)?;
        }
        Ok(result)
    }

    /// Read a 64-bit length prefix as a `usize`, failing if it cannot index this buffer.
    pub fn read_len_u64(&self, offset: usize) -> Result<usize, ParseError> {
        let raw = self.read_u64(offset)?;
        usize::try_from(raw).map_err(|_| ParseError::TruncatedBuffer {
            offset,
            needed: usize::MAX,
            len: self.bytes.len(),
        })
    }

    /// Read a null-terminated byte string starting at `offset`.
    /// A string running into the end of the buffer is returned as-is.
    pub fn read_null_terminated(&self, offset: usize) -> Result<&'a [u8], ParseError> {
        if offset > self.bytes.len() {
            return Err(ParseError::TruncatedBuffer {
                offset,
                needed: 1,
                len: self.bytes.len(),
            });
        }
        let rest = &self.bytes[offset..];
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        Ok(&rest[..end])
    }

    pub fn read_name(&self, offset: usize) -> Result<String, ParseError> {
        let bytes = self.read_null_terminated(offset)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ParseError::InvalidName { offset })
    }
}

/// Growable little-endian output buffer.
#[derive(Debug, Default, Clone)]
pub struct LittleEndianWriter {
    buf: Vec<u8>,
}

impl LittleEndianWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Zero-fill until `base + len()` is a multiple of `align`.
    pub fn pad_to(&mut self, align: usize, base: usize) {
        while (base + self.buf.len()) % align != 0 {
            self.buf.push(0);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

pub(crate) fn checked_u16(field: &'static str, value: usize) -> Result<u16, ValidationError> {
    u16::try_from(value).map_err(|_| ValidationError::ValueOutOfRange {
        field,
        value: value as u64,
    })
}

pub(crate) fn checked_u32(field: &'static str, value: usize) -> Result<u32, ValidationError> {
    u32::try_from(value).map_err(|_| ValidationError::ValueOutOfRange {
        field,
        value: value as u64,
    })
}

pub(crate) fn checked_u8(field: &'static str, value: usize) -> Result<u8, ValidationError> {
    u8::try_from(value).map_err(|_| ValidationError::ValueOutOfRange {
        field,
        value: value as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::{LittleEndianReader, LittleEndianWriter};
    use crate::error::ParseError;

    #[test]
    fn reads_little_endian_at_offsets() {
        let bytes = [0xAA, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let r = LittleEndianReader::new(&bytes);
        assert_eq!(r.read_u8(0).unwrap(), 0xAA);
        assert_eq!(r.read_u16(1).unwrap(), 0x1234);
        assert_eq!(r.read_u32(3).unwrap(), 0x1234_5678);
    }

    #[test]
    fn read_past_end_reports_truncation() {
        let bytes = [0u8; 6];
        let r = LittleEndianReader::new(&bytes);
        assert_eq!(
            r.read_u64(0),
            Err(ParseError::TruncatedBuffer {
                offset: 0,
                needed: 8,
                len: 6
            })
        );
    }

    #[test]
    fn null_terminated_string_stops_at_terminator_or_end() {
        let bytes = b"grid\0act";
        let r = LittleEndianReader::new(bytes);
        assert_eq!(r.read_null_terminated(0).unwrap(), b"grid");
        assert_eq!(r.read_null_terminated(5).unwrap(), b"act");
        assert_eq!(r.read_null_terminated(8).unwrap(), b"");
        assert!(r.read_null_terminated(9).is_err());
    }

    #[test]
    fn pad_to_respects_base_offset() {
        let mut w = LittleEndianWriter::new();
        w.write_u8(1);
        w.pad_to(8, 4);
        assert_eq!(w.len(), 4);
        w.pad_to(8, 0);
        assert_eq!(w.len(), 8);
    }
}
