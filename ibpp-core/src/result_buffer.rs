//! Decoding of the engine info responses
//!
//! The engine answers `*_info` calls with a sequence of
//! `[tag][2 bytes length][value]` items, terminated by `isc_info_end`.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::{ibase, FbError};

#[derive(Debug, Clone)]
pub struct ResultBuffer {
    buffer: Vec<u8>,
}

impl ResultBuffer {
    /// Buffer of `size` bytes, filled with the end sentinel
    pub fn new(size: usize) -> Self {
        ResultBuffer {
            buffer: vec![ibase::isc_info_end; size],
        }
    }

    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|b| *b = ibase::isc_info_end);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// The response didn't fit the buffer
    pub fn is_truncated(&self) -> bool {
        self.find_token(ibase::isc_info_truncated).is_some()
    }

    fn length_at(&self, pos: usize) -> Option<usize> {
        let bytes = self.buffer.get(pos..pos + 2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]) as usize)
    }

    /// Position of the first item with `tag`
    pub fn find_token(&self, tag: u8) -> Option<usize> {
        let mut pos = 0;

        while let Some(&current) = self.buffer.get(pos) {
            if current == tag {
                return Some(pos);
            }
            if current == ibase::isc_info_end {
                return None;
            }
            if current == ibase::isc_info_truncated {
                return None;
            }

            let len = self.length_at(pos + 1)?;
            pos += 3 + len;
        }

        None
    }

    /// Position of the `subtag` item nested in the value of the `tag` item
    pub fn find_token2(&self, tag: u8, subtag: u8) -> Option<usize> {
        let start = self.find_token(tag)?;
        let end = start + 3 + self.length_at(start + 1)?;
        let mut pos = start + 3;

        while pos < end {
            let current = *self.buffer.get(pos)?;
            if current == subtag {
                return Some(pos);
            }
            if current == ibase::isc_info_end {
                return None;
            }

            let len = self.length_at(pos + 1)?;
            pos += 3 + len;
        }

        None
    }

    fn value_at(&self, pos: usize) -> Result<&[u8], FbError> {
        let len = self
            .length_at(pos + 1)
            .ok_or_else(|| FbError::protocol("RB::GetValue", "Truncated item"))?;

        self.buffer
            .get(pos + 3..pos + 3 + len)
            .ok_or_else(|| FbError::protocol("RB::GetValue", "Truncated item"))
    }

    /// Little endian integer of 1, 2 or 4 bytes
    fn decode_int(value: &[u8]) -> Result<i32, FbError> {
        let mut rdr = Cursor::new(value);

        Ok(match value.len() {
            0 => 0,
            1 => rdr.read_i8()? as i32,
            2 => rdr.read_i16::<LittleEndian>()? as i32,
            _ => rdr.read_i32::<LittleEndian>()?,
        })
    }

    pub fn get_int(&self, tag: u8) -> Result<i32, FbError> {
        let pos = self
            .find_token(tag)
            .ok_or_else(|| FbError::protocol("RB::GetValue", "Token not found"))?;

        Self::decode_int(self.value_at(pos)?)
    }

    pub fn get_int2(&self, tag: u8, subtag: u8) -> Result<i32, FbError> {
        let pos = self
            .find_token2(tag, subtag)
            .ok_or_else(|| FbError::protocol("RB::GetValue", "Token not found"))?;

        Self::decode_int(self.value_at(pos)?)
    }

    pub fn get_bool(&self, tag: u8) -> Result<bool, FbError> {
        Ok(self.get_int(tag)? != 0)
    }

    pub fn get_string(&self, tag: u8) -> Result<String, FbError> {
        let pos = self
            .find_token(tag)
            .ok_or_else(|| FbError::protocol("RB::GetString", "Token not found"))?;

        Ok(String::from_utf8_lossy(self.value_at(pos)?).into_owned())
    }

    /// Sum of a per relation count array: 6 bytes per relation, a 2 bytes
    /// relation id followed by a 4 bytes count. A missing tag sums to 0
    pub fn get_summed_counts(&self, tag: u8) -> Result<i32, FbError> {
        let pos = match self.find_token(tag) {
            Some(pos) => pos,
            None => return Ok(0),
        };

        let value = self.value_at(pos)?;
        let mut rdr = Cursor::new(value);
        let mut sum: i32 = 0;

        for _ in 0..value.len() / 6 {
            rdr.read_u16::<LittleEndian>()?;
            sum = sum.wrapping_add(rdr.read_i32::<LittleEndian>()?);
        }

        Ok(sum)
    }

    /// All the values of a repeated item
    pub fn get_all(&self, tag: u8) -> Result<Vec<&[u8]>, FbError> {
        let mut values = vec![];
        let mut pos = 0;

        while let Some(&current) = self.buffer.get(pos) {
            if current == ibase::isc_info_end || current == ibase::isc_info_truncated {
                break;
            }

            let value = self.value_at(pos)?;
            if current == tag {
                values.push(value);
            }
            pos += 3 + value.len();
        }

        Ok(values)
    }
}

/// Helper to build info responses, mostly useful to implement
/// [`FbClient`](crate::FbClient) over something that isn't fbclient
#[derive(Debug, Default)]
pub struct ResponseWriter {
    bytes: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, tag: u8, value: &[u8]) -> Self {
        self.bytes.push(tag);
        self.bytes.extend_from_slice(&(value.len() as u16).to_le_bytes());
        self.bytes.extend_from_slice(value);
        self
    }

    pub fn int(self, tag: u8, value: i32) -> Self {
        self.item(tag, &value.to_le_bytes())
    }

    /// Copies the response to `buffer`, flagging truncation as the engine does
    pub fn write_to(mut self, buffer: &mut [u8]) {
        self.bytes.push(ibase::isc_info_end);

        if self.bytes.len() > buffer.len() {
            if let Some(first) = buffer.first_mut() {
                *first = ibase::isc_info_truncated;
            }
            return;
        }

        buffer[..self.bytes.len()].copy_from_slice(&self.bytes);
    }
}
