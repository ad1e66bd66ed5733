use byteorder::{ByteOrder, LittleEndian};

use crate::error::SourceQueryError;

/// Sequential reader over a response payload.
///
/// Strings are null-terminated, every number is little-endian. Fixed-width
/// reads fail with [SourceQueryError::ShortResponse] instead of running off
/// the end of the buffer, so callers that want a field to be optional check
/// [Cursor::remaining] first.
#[derive(Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, offset: 0 }
    }

    /// Bytes left between the offset and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Get the value of a null-terminated string at the current offset.
    ///
    /// Moves the offset past the null byte. A string missing its terminator
    /// runs to the end of the buffer. At the end of the buffer this returns an
    /// empty string and does not move.
    pub fn read_string(&mut self) -> String {
        let rest: &'a [u8] = self.data.get(self.offset..).unwrap_or(&[]);

        match rest.iter().position(|&c| c == 0) {
            Some(end) => {
                self.offset += end + 1;
                String::from_utf8_lossy(&rest[..end]).into_owned()
            }
            None => {
                self.offset += rest.len();
                String::from_utf8_lossy(rest).into_owned()
            }
        }
    }

    /// Move the offset forward `len` bytes without decoding them.
    pub fn skip(&mut self, len: usize) -> Result<(), SourceQueryError> {
        self.take(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, SourceQueryError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, SourceQueryError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, SourceQueryError> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, SourceQueryError> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, SourceQueryError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SourceQueryError> {
        if self.remaining() < len {
            return Err(SourceQueryError::ShortResponse);
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }
}
