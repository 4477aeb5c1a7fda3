//! Database and transaction parameter buffers (DPB / TPB)
//!
//! Tag-length-value byte strings read by the engine on attach and
//! transaction start. The version byte is written by the first insert.

use crate::ibase;

/// Growth step of the buffers
const BUFFER_INCREMENT: usize = 128;

/// Values longer than this are truncated, the length is a single byte
const MAX_VALUE_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBuffer {
    version: u8,
    buffer: Vec<u8>,
}

impl ParamBuffer {
    /// Empty database parameter buffer
    pub fn dpb() -> Self {
        ParamBuffer {
            version: ibase::isc_dpb_version1,
            buffer: Vec::new(),
        }
    }

    /// Empty transaction parameter buffer
    pub fn tpb() -> Self {
        ParamBuffer {
            version: ibase::isc_tpb_version3,
            buffer: Vec::new(),
        }
    }

    fn grow(&mut self, needed: usize) {
        if self.buffer.is_empty() {
            self.buffer.reserve_exact(BUFFER_INCREMENT);
            self.buffer.push(self.version);
        }

        let wanted = self.buffer.len() + needed;
        if wanted > self.buffer.capacity() {
            let rounded = (wanted + BUFFER_INCREMENT - 1) / BUFFER_INCREMENT * BUFFER_INCREMENT;
            self.buffer.reserve_exact(rounded - self.buffer.len());
        }
    }

    /// Appends `[tag][len][bytes]`
    pub fn insert_bytes(&mut self, tag: u8, value: &[u8]) {
        let value = &value[..value.len().min(MAX_VALUE_LENGTH)];

        self.grow(2 + value.len());
        self.buffer.push(tag);
        self.buffer.push(value.len() as u8);
        self.buffer.extend_from_slice(value);
    }

    pub fn insert_str(&mut self, tag: u8, value: &str) {
        self.insert_bytes(tag, value.as_bytes());
    }

    /// Integers go in the engine byte order, little endian
    pub fn insert_i16(&mut self, tag: u8, value: i16) {
        self.insert_bytes(tag, &value.to_le_bytes());
    }

    pub fn insert_i32(&mut self, tag: u8, value: i32) {
        self.insert_bytes(tag, &value.to_le_bytes());
    }

    pub fn insert_bool(&mut self, tag: u8, value: bool) {
        self.insert_bytes(tag, &[value as u8]);
    }

    pub fn insert_u8(&mut self, tag: u8, value: u8) {
        self.insert_bytes(tag, &[value]);
    }

    /// Appends a bare item, as the tpb options are
    pub fn insert_item(&mut self, item: u8) {
        self.grow(1);
        self.buffer.push(item);
    }

    /// Appends `[len][bytes]` with no tag, used by the tpb table reservations
    pub fn insert_len_str(&mut self, value: &str) {
        let value = &value.as_bytes()[..value.len().min(MAX_VALUE_LENGTH)];

        self.grow(1 + value.len());
        self.buffer.push(value.len() as u8);
        self.buffer.extend_from_slice(value);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn reset(&mut self) {
        self.buffer = Vec::new();
    }
}
