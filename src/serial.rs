//! Serialization buffer
//!
//! `SerialBuf` is the single place where cross-platform cache portability is
//! guaranteed: every multi-byte integer is written little-endian regardless
//! of host byte order, and every persisted structure in the engine goes
//! through it. Framing is magic-signature plus CRC-32 over the preceding
//! bytes; a mismatch sets a sticky error flag and all subsequent operations
//! become no-ops, so a truncated or corrupted buffer can never be partially
//! trusted.

use tracing::error;

/// Serialization/deserialization buffer with an internal cursor
#[derive(Debug)]
pub struct SerialBuf {
    buf: Vec<u8>,
    pos: usize,
    error: bool,
    /// Write limit in bytes; `None` grows without bound
    limit: Option<usize>,
}

impl SerialBuf {
    /// Create a growable write buffer
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            pos: 0,
            error: false,
            limit: None,
        }
    }

    /// Create a fixed-size write buffer; writing past `size` sets the
    /// error flag instead of resizing
    pub fn fixed(size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(size),
            pos: 0,
            error: false,
            limit: Some(size),
        }
    }

    /// Wrap existing bytes for reading
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let limit = Some(bytes.len());
        Self {
            buf: bytes,
            pos: 0,
            error: false,
            limit,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// True if any operation failed since the last `reset`
    pub fn error(&self) -> bool {
        self.error
    }

    pub fn set_error(&mut self) {
        self.error = true;
    }

    /// Move cursor to the beginning and clear the error flag
    pub fn reset(&mut self) {
        self.pos = 0;
        self.error = false;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        if self.error {
            return;
        }
        // A bounded buffer signals overflow instead of growing. The limit is
        // the requested size, not the allocation, which may be larger.
        if let Some(limit) = self.limit {
            if self.pos + bytes.len() > limit {
                self.error = true;
                return;
            }
        }
        if self.pos == self.buf.len() {
            self.buf.extend_from_slice(bytes);
        } else {
            let end = self.pos + bytes.len();
            if end > self.buf.len() {
                self.buf.resize(end, 0);
            }
            self.buf[self.pos..end].copy_from_slice(bytes);
        }
        self.pos += bytes.len();
    }

    fn read_bytes(&mut self, n: usize) -> Option<&[u8]> {
        if self.error || self.pos + n > self.buf.len() {
            self.error = true;
            return None;
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(s)
    }

    // write methods

    pub fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    /// Length-prefixed UTF-8 byte string
    pub fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    /// Length-prefixed wide string (UTF-16 code units)
    pub fn write_wstr(&mut self, s: &str) {
        let units: Vec<u16> = s.encode_utf16().collect();
        self.write_u32(units.len() as u32);
        for u in units {
            self.write_u16(u);
        }
    }

    /// Write a literal signature
    pub fn put_magic(&mut self, tag: &[u8]) {
        self.write_bytes(tag);
    }

    /// Append a CRC-32 over the last `n` bytes written
    pub fn put_crc(&mut self, n: usize) {
        if self.error {
            return;
        }
        if n > self.pos {
            self.error = true;
            return;
        }
        let crc = crc32c::crc32c(&self.buf[self.pos - n..self.pos]);
        self.write_u32(crc);
    }

    /// CRC-32 of the whole buffer contents
    pub fn get_crc(&self) -> u32 {
        crc32c::crc32c(&self.buf)
    }

    // read methods

    pub fn read_u8(&mut self) -> u8 {
        self.read_bytes(1).map(|b| b[0]).unwrap_or(0)
    }

    pub fn read_bool(&mut self) -> bool {
        self.read_u8() != 0
    }

    pub fn read_u16(&mut self) -> u16 {
        self.read_bytes(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .unwrap_or(0)
    }

    pub fn read_u32(&mut self) -> u32 {
        self.read_bytes(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .unwrap_or(0)
    }

    pub fn read_i32(&mut self) -> i32 {
        self.read_u32() as i32
    }

    pub fn read_u64(&mut self) -> u64 {
        let mut b8 = [0u8; 8];
        match self.read_bytes(8) {
            Some(b) => {
                b8.copy_from_slice(b);
                u64::from_le_bytes(b8)
            }
            None => 0,
        }
    }

    pub fn read_str(&mut self) -> String {
        let len = self.read_u32() as usize;
        match self.read_bytes(len) {
            Some(b) => match std::str::from_utf8(b) {
                Ok(s) => s.to_string(),
                Err(_) => {
                    self.error = true;
                    String::new()
                }
            },
            None => String::new(),
        }
    }

    pub fn read_wstr(&mut self) -> String {
        let count = self.read_u32() as usize;
        let mut units = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            if self.error {
                return String::new();
            }
            units.push(self.read_u16());
        }
        match String::from_utf16(&units) {
            Ok(s) => s,
            Err(_) => {
                self.error = true;
                String::new()
            }
        }
    }

    /// Verify a literal signature at the cursor
    pub fn check_magic(&mut self, tag: &[u8]) -> bool {
        if self.error {
            return false;
        }
        match self.read_bytes(tag.len()) {
            Some(b) if b == tag => true,
            _ => {
                self.error = true;
                false
            }
        }
    }

    /// Recompute CRC-32 over the last `n` bytes before the cursor and
    /// compare with the stored value
    pub fn check_crc(&mut self, n: usize) -> bool {
        if self.error {
            return false;
        }
        if n > self.pos {
            self.error = true;
            return false;
        }
        let computed = crc32c::crc32c(&self.buf[self.pos - n..self.pos]);
        let stored = self.read_u32();
        if self.error {
            return false;
        }
        if stored != computed {
            error!(stored, computed, "serial buffer CRC mismatch");
            self.error = true;
            return false;
        }
        true
    }
}
