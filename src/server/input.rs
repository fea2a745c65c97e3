//! Input handling for line sessions.
//!
//! This module turns the raw byte stream of a line connection into complete
//! lines. Lines may end in CR, LF or CRLF; backspace editing is applied and
//! other control characters are dropped. A line that grows past the maximum
//! length is discarded whole, never cut short.

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Result, RoomcastError};

/// Control bytes handled by the line buffer.
pub mod control {
    /// Null.
    pub const NUL: u8 = 0x00;
    /// Backspace.
    pub const BS: u8 = 0x08;
    /// Horizontal tab.
    pub const HT: u8 = 0x09;
    /// Line feed.
    pub const LF: u8 = 0x0A;
    /// Carriage return.
    pub const CR: u8 = 0x0D;
    /// Delete.
    pub const DEL: u8 = 0x7F;
}

/// Result of processing input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
    /// A complete line was entered.
    Line(String),
    /// Input is still being buffered.
    Buffering,
    /// The pending line grew past the maximum size. The rest of it, up to
    /// the next line ending, is discarded.
    Overflow,
}

/// A line buffer for input processing.
#[derive(Debug)]
pub struct LineBuffer {
    /// The current buffer contents.
    buffer: Vec<u8>,
    /// Maximum line length in bytes.
    max_size: usize,
    /// Whether the previous byte was a CR, so a following LF is swallowed.
    after_cr: bool,
    /// Skipping the remainder of an overlong line.
    discarding: bool,
}

impl LineBuffer {
    /// Create a new line buffer with the given maximum size.
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(max_size.min(1024)),
            max_size,
            after_cr: false,
            discarding: false,
        }
    }

    /// Get the current buffer contents.
    pub fn contents(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.after_cr = false;
        self.discarding = false;
    }

    /// Process a single byte of input.
    pub fn process_byte(&mut self, byte: u8) -> InputResult {
        let after_cr = std::mem::replace(&mut self.after_cr, false);

        match byte {
            control::LF if after_cr => InputResult::Buffering,
            control::CR | control::LF => {
                self.after_cr = byte == control::CR;
                if std::mem::replace(&mut self.discarding, false) {
                    InputResult::Buffering
                } else {
                    InputResult::Line(self.take_line())
                }
            }
            control::BS | control::DEL => {
                self.erase_last_char();
                InputResult::Buffering
            }
            control::NUL => InputResult::Buffering,
            control::HT => self.push(byte),
            _ if byte < 32 => InputResult::Buffering,
            _ => self.push(byte),
        }
    }

    /// Process multiple bytes of input, returning every completed line.
    pub fn process_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        bytes
            .iter()
            .filter_map(|&byte| match self.process_byte(byte) {
                InputResult::Line(line) => Some(line),
                InputResult::Buffering | InputResult::Overflow => None,
            })
            .collect()
    }

    /// Take whatever is buffered as a final line, if anything.
    ///
    /// Used when the peer closes the connection without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        self.after_cr = false;
        if std::mem::replace(&mut self.discarding, false) || self.buffer.is_empty() {
            None
        } else {
            Some(self.take_line())
        }
    }

    fn push(&mut self, byte: u8) -> InputResult {
        if self.discarding {
            return InputResult::Buffering;
        }
        if self.buffer.len() >= self.max_size {
            self.buffer.clear();
            self.discarding = true;
            return InputResult::Overflow;
        }
        self.buffer.push(byte);
        InputResult::Buffering
    }

    /// Remove the last character, including every byte of a multi-byte one.
    fn erase_last_char(&mut self) {
        while let Some(byte) = self.buffer.pop() {
            // Stop once a byte that is not a UTF-8 continuation byte is removed
            if byte & 0xC0 != 0x80 {
                break;
            }
        }
    }

    /// Take the current buffer contents as a string and clear the buffer.
    fn take_line(&mut self) -> String {
        let bytes = std::mem::take(&mut self.buffer);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Reads complete lines from an async byte stream.
pub struct LineReader<R> {
    reader: R,
    buffer: LineBuffer,
    pending: VecDeque<String>,
    eof: bool,
    overflowed: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Create a reader whose lines are capped at `max_line_length` bytes.
    pub fn new(reader: R, max_line_length: usize) -> Self {
        Self {
            reader,
            buffer: LineBuffer::new(max_line_length),
            pending: VecDeque::new(),
            eof: false,
            overflowed: false,
        }
    }

    /// Read the next line. Returns `None` once the peer has closed the stream.
    ///
    /// A line longer than the maximum fails with [`RoomcastError::LineTooLong`]
    /// after the lines completed before it have been returned.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = [0u8; 1024];

        loop {
            if let Some(line) = self.pending.pop_front() {
                return Ok(Some(line));
            }
            if self.overflowed {
                return Err(RoomcastError::LineTooLong(self.buffer.max_size));
            }
            if self.eof {
                return Ok(None);
            }

            let n = self.reader.read(&mut buf).await?;
            if n == 0 {
                self.eof = true;
                self.pending.extend(self.buffer.finish());
                continue;
            }
            for &byte in &buf[..n] {
                match self.buffer.process_byte(byte) {
                    InputResult::Line(line) => self.pending.push_back(line),
                    InputResult::Buffering => {}
                    InputResult::Overflow => {
                        self.overflowed = true;
                        break;
                    }
                }
            }
        }
    }
}
