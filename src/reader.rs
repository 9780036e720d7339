//! Incremental line reader over any byte source.
//!
//! Pulls chunks from the underlying `Read` into one growable buffer and hands
//! out `\n`-delimited slices of it, so a multi-hundred-megabyte trace is
//! never materialized whole. Each returned slice borrows the internal buffer
//! and is only valid until the next call; the borrow checker enforces that.

use std::io::Read;

use crate::feedback::ImportError;

/// Hard cap on a single line. Generous: real traces stay under a few KiB per
/// line, so anything past this is a corrupt or hostile input.
pub const DEFAULT_MAX_LINE_LEN: usize = 8 * 1024 * 1024;

const READ_CHUNK: usize = 64 * 1024;

pub struct LineReader<R: Read> {
    source: R,
    buf: Vec<u8>,
    /// Start of unconsumed bytes in `buf`.
    start: usize,
    /// End of valid bytes in `buf`.
    end: usize,
    eof: bool,
    max_line_len: usize,
}

impl<R: Read> LineReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_max_line_len(source, DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_line_len(source: R, max_line_len: usize) -> Self {
        Self {
            source,
            buf: vec![0; READ_CHUNK],
            start: 0,
            end: 0,
            eof: false,
            max_line_len,
        }
    }

    /// The next line without its trailing `\n`, or `None` at end of stream.
    /// A final line with no trailing newline is still yielded.
    pub fn next_line(&mut self) -> Result<Option<&[u8]>, ImportError> {
        match self.fill_line()? {
            Some((start, end)) => Ok(Some(&self.buf[start..end])),
            None => Ok(None),
        }
    }

    /// Locate the next line, reading more input as needed, and return its
    /// range within `buf`. Kept index-based so `next_line` can hand out the
    /// borrow in one place.
    fn fill_line(&mut self) -> Result<Option<(usize, usize)>, ImportError> {
        let mut search_from = self.start;
        loop {
            if let Some(off) = self.buf[search_from..self.end]
                .iter()
                .position(|&b| b == b'\n')
            {
                let start = self.start;
                let end = search_from + off;
                self.check_line_len(end - start)?;
                self.start = end + 1;
                return Ok(Some((start, end)));
            }

            if self.eof {
                if self.start == self.end {
                    return Ok(None);
                }
                let start = self.start;
                let end = self.end;
                self.check_line_len(end - start)?;
                self.start = end;
                return Ok(Some((start, end)));
            }

            // No newline yet. Bail before buffering an unbounded line.
            self.check_line_len(self.end - self.start)?;

            if self.start > 0 {
                self.buf.copy_within(self.start..self.end, 0);
                self.end -= self.start;
                self.start = 0;
            }
            if self.end == self.buf.len() {
                let new_len = (self.buf.len() * 2).max(READ_CHUNK);
                self.buf.resize(new_len, 0);
            }
            search_from = self.end;

            match self.source.read(&mut self.buf[self.end..]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.end += n,
                Err(err) => return Err(ImportError::Io(err)),
            }
        }
    }

    fn check_line_len(&self, len: usize) -> Result<(), ImportError> {
        if len > self.max_line_len {
            return Err(ImportError::LineTooLong {
                limit: self.max_line_len,
            });
        }
        Ok(())
    }
}
