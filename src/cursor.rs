//! Single-pass byte cursor for the line grammar and event payloads.
//!
//! Everything here works on raw bytes borrowed from the reader's buffer and
//! allocates nothing. Number parsing accumulates digits directly; the only
//! UTF-8 validation happens on the short token a float is parsed from.

/// Cursor over one line. Cheap to copy; handlers take their own copy of the
/// payload cursor and advance it independently.
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// The byte at the cursor, if any.
    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Consume and return one byte.
    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Consume `byte` if it is next. Returns whether it was consumed.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skip past spaces and tabs.
    pub fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    /// Skip bytes while `pred` holds.
    pub fn skip_while(&mut self, pred: impl Fn(u8) -> bool) {
        while matches!(self.peek(), Some(b) if pred(b)) {
            self.pos += 1;
        }
    }

    /// Advance the cursor by `n` bytes (clamped to the end).
    pub fn advance_by(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.bytes.len());
    }

    /// Bytes up to (not including) the next `byte`, leaving the cursor on the
    /// delimiter. Without a delimiter this takes everything that remains.
    pub fn take_until(&mut self, byte: u8) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == byte {
                break;
            }
            self.pos += 1;
        }
        &self.bytes[start..self.pos]
    }

    /// Everything from the cursor to the end of the line.
    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Parse a run of ASCII digits as u32. `None` without at least one digit
    /// or on overflow; the cursor does not move on failure.
    pub fn read_u32(&mut self) -> Option<u32> {
        let start = self.pos;
        let mut value: u64 = 0;
        while let Some(b) = self.peek() {
            if !b.is_ascii_digit() {
                break;
            }
            value = value * 10 + u64::from(b - b'0');
            if value > u64::from(u32::MAX) {
                self.pos = start;
                return None;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        Some(value as u32)
    }

    /// Parse a run of ASCII digits as a non-negative i32.
    pub fn read_i32(&mut self) -> Option<i32> {
        let start = self.pos;
        let value = self.read_u32()?;
        if value > i32::MAX as u32 {
            self.pos = start;
            return None;
        }
        Some(value as i32)
    }

    /// Parse a decimal number (optional sign, optional fraction) as f64.
    pub fn read_f64(&mut self) -> Option<f64> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-')) {
            self.pos += 1;
        }
        let int_start = self.pos;
        self.skip_while(|b| b.is_ascii_digit());
        if self.pos == int_start {
            self.pos = start;
            return None;
        }
        if self.eat(b'.') {
            self.skip_while(|b| b.is_ascii_digit());
        }
        let token = &self.bytes[start..self.pos];
        match std::str::from_utf8(token).ok().and_then(|s| s.parse().ok()) {
            Some(value) => Some(value),
            None => {
                self.pos = start;
                None
            }
        }
    }
}
