//! Line buffer for console input
//!
//! Capacity matches a classic 16-byte `fgets` buffer: 15 characters plus
//! the terminator. A longer line is split, the tail is returned by the
//! next read.

use core::fmt::{self, Write};

use super::ConsoleError;
use super::io::ConsoleOut;

/// Buffer size including the terminator.
pub const LINE_CAPACITY: usize = 16;

/// Maximum characters per line.
pub const MAX_LINE_CHARS: usize = LINE_CAPACITY - 1;

/// One line of operator input. Overwritten every read.
pub struct ConsoleLine {
    buf: [u8; MAX_LINE_CHARS],
    len: usize,
    /// Read ended on CR/LF rather than on a full buffer.
    terminated: bool,
}

impl ConsoleLine {
    /// Create empty buffer
    pub const fn new() -> Self {
        Self {
            buf: [0u8; MAX_LINE_CHARS],
            len: 0,
            terminated: false,
        }
    }

    /// Push a character. Returns `false` when full.
    pub fn push(&mut self, c: u8) -> bool {
        if self.len < MAX_LINE_CHARS {
            self.buf[self.len] = c;
            self.len += 1;
            true
        } else {
            false
        }
    }

    /// Remove last character
    pub fn backspace(&mut self) -> bool {
        if self.len > 0 {
            self.len -= 1;
            true
        } else {
            false
        }
    }

    /// Clear buffer
    pub fn clear(&mut self) {
        self.len = 0;
        self.terminated = false;
    }

    /// Set buffer contents from string, truncating to capacity.
    pub fn set(&mut self, s: &str) {
        let bytes = s.as_bytes();
        let copy_len = bytes.len().min(MAX_LINE_CHARS);
        self.buf[..copy_len].copy_from_slice(&bytes[..copy_len]);
        self.len = copy_len;
        self.terminated = true;
    }

    /// Get buffer as string slice.
    ///
    /// Bytes are stored as received. A line that is not valid UTF-8 reads
    /// as empty, which no parser accepts; use [`display`](Self::display)
    /// to show it.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    /// The line as typed, invalid UTF-8 shown as U+FFFD.
    pub fn display(&self) -> LineDisplay<'_> {
        LineDisplay(self.as_bytes())
    }

    /// Get buffer length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == MAX_LINE_CHARS
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Default for ConsoleLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Lossy [`fmt::Display`] view of a [`ConsoleLine`].
pub struct LineDisplay<'a>(&'a [u8]);

impl fmt::Display for LineDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        loop {
            match core::str::from_utf8(rest) {
                Ok(s) => return f.write_str(s),
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    f.write_str(core::str::from_utf8(valid).unwrap_or(""))?;
                    f.write_char(char::REPLACEMENT_CHARACTER)?;
                    let skip = e.error_len().unwrap_or(after.len());
                    rest = &after[skip..];
                }
            }
        }
    }
}

/// Blocking byte input (the console UART RX side).
pub trait ByteSource {
    /// Block until one byte is available.
    fn read_byte(&mut self) -> Result<u8, ConsoleError>;
}

/// Turns a byte stream into [`ConsoleLine`]s.
///
/// Accepts CR, LF or CRLF. Handles backspace. Every other byte is stored
/// unchanged; printable ASCII and tab are echoed when echo is on.
pub struct LineReader<S> {
    source: S,
    echo: bool,
    /// Previous line ended on CR; swallow a directly following LF.
    skip_lf: bool,
}

impl<S: ByteSource> LineReader<S> {
    pub const fn new(source: S, echo: bool) -> Self {
        Self { source, echo, skip_lf: false }
    }

    /// Read one line, blocking.
    ///
    /// Returns when a terminator arrives or the buffer is full.
    pub fn read_line(&mut self, line: &mut ConsoleLine, out: &mut dyn ConsoleOut) -> Result<(), ConsoleError> {
        line.clear();

        loop {
            let byte = self.source.read_byte()?;
            let skip_lf = core::mem::replace(&mut self.skip_lf, false);

            match byte {
                b'\n' if skip_lf => continue,

                b'\r' | b'\n' => {
                    self.skip_lf = byte == b'\r';
                    line.terminated = true;
                    if self.echo {
                        let _ = out.write_str("\n");
                    }
                    return Ok(());
                }

                // Backspace / DEL
                0x08 | 0x7F => {
                    if line.backspace() && self.echo {
                        let _ = out.write_str("\x08 \x08");
                        out.flush();
                    }
                }

                // Everything else is kept as typed, so tabs still separate
                // tokens and stray bytes still fail to parse.
                _ => {
                    line.push(byte);
                    if self.echo && (byte == b'\t' || (0x20..=0x7E).contains(&byte)) {
                        let _ = out.write_char(byte as char);
                        out.flush();
                    }
                    if line.is_full() {
                        if self.echo {
                            let _ = out.write_str("\n");
                        }
                        return Ok(());
                    }
                }
            }
        }
    }
}
