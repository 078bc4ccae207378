//! Line buffer and line reader tests

use std::collections::VecDeque;

use dcmotor_bringup::console::line_buffer::{ByteSource, ConsoleLine, LineReader, MAX_LINE_CHARS};
use dcmotor_bringup::console::parser::parse_choice;
use dcmotor_bringup::console::{ConsoleError, ConsoleOut};

#[test]
fn test_line_buffer_push() {
    let mut buf = ConsoleLine::new();

    buf.push(b'1');
    buf.push(b'2');

    assert_eq!(buf.as_str(), "12");
    assert!(!buf.is_terminated());
}

#[test]
fn test_line_buffer_backspace() {
    let mut buf = ConsoleLine::new();

    buf.push(b'7');
    buf.push(b'x');
    assert!(buf.backspace());

    assert_eq!(buf.as_str(), "7");
    assert!(buf.backspace());
    assert!(!buf.backspace());
    assert!(buf.is_empty());
}

#[test]
fn test_line_buffer_overflow() {
    let mut buf = ConsoleLine::new();

    for _ in 0..MAX_LINE_CHARS {
        assert!(buf.push(b'a'));
    }
    assert!(buf.is_full());
    assert!(!buf.push(b'b'));
    assert_eq!(buf.len(), 15);
}

#[test]
fn test_reader_lf_and_cr() {
    let mut reader = LineReader::new(Bytes::new(b"1\n2\r"), false);
    let mut line = ConsoleLine::new();
    let mut out = Out::default();

    reader.read_line(&mut line, &mut out).unwrap();
    assert_eq!(line.as_str(), "1");
    assert!(line.is_terminated());

    reader.read_line(&mut line, &mut out).unwrap();
    assert_eq!(line.as_str(), "2");
}

#[test]
fn test_reader_crlf_is_one_terminator() {
    let mut reader = LineReader::new(Bytes::new(b"3\r\n4\r\n"), false);
    let mut line = ConsoleLine::new();
    let mut out = Out::default();

    reader.read_line(&mut line, &mut out).unwrap();
    assert_eq!(line.as_str(), "3");
    reader.read_line(&mut line, &mut out).unwrap();
    assert_eq!(line.as_str(), "4");
}

#[test]
fn test_reader_empty_line() {
    let mut reader = LineReader::new(Bytes::new(b"\n"), false);
    let mut line = ConsoleLine::new();

    reader.read_line(&mut line, &mut Out::default()).unwrap();
    assert!(line.is_empty());
    assert!(line.is_terminated());
}

#[test]
fn test_reader_splits_long_line() {
    // 20 characters: 15 now, 5 on the next read
    let mut reader = LineReader::new(Bytes::new(b"12345678901234567890\n"), false);
    let mut line = ConsoleLine::new();
    let mut out = Out::default();

    reader.read_line(&mut line, &mut out).unwrap();
    assert_eq!(line.as_str(), "123456789012345");
    assert!(!line.is_terminated());

    reader.read_line(&mut line, &mut out).unwrap();
    assert_eq!(line.as_str(), "67890");
    assert!(line.is_terminated());
}

#[test]
fn test_reader_backspace_edits_line() {
    let mut reader = LineReader::new(Bytes::new(b"12\x08\x7f3\n"), false);
    let mut line = ConsoleLine::new();

    reader.read_line(&mut line, &mut Out::default()).unwrap();
    assert_eq!(line.as_str(), "3");
}

#[test]
fn test_reader_keeps_tab_between_tokens() {
    let mut reader = LineReader::new(Bytes::new(b"0\t8\n3\t9\n"), false);
    let mut line = ConsoleLine::new();

    reader.read_line(&mut line, &mut Out::default()).unwrap();
    assert_eq!(line.as_str(), "0\t8");
    assert_eq!(parse_choice(line.as_str()), Some(0));

    reader.read_line(&mut line, &mut Out::default()).unwrap();
    assert_eq!(parse_choice(line.as_str()), Some(3));
}

#[test]
fn test_reader_keeps_other_bytes() {
    let mut reader = LineReader::new(Bytes::new(b"\x1b4\n\xc3\xa95\n"), false);
    let mut line = ConsoleLine::new();

    reader.read_line(&mut line, &mut Out::default()).unwrap();
    assert_eq!(line.as_bytes(), b"\x1b4");
    assert_eq!(parse_choice(line.as_str()), None);

    reader.read_line(&mut line, &mut Out::default()).unwrap();
    assert_eq!(line.as_str(), "\u{e9}5");
    assert_eq!(parse_choice(line.as_str()), None);
}

#[test]
fn test_invalid_utf8_never_parses_and_displays_lossy() {
    let mut reader = LineReader::new(Bytes::new(b"\xff5\n"), false);
    let mut line = ConsoleLine::new();

    reader.read_line(&mut line, &mut Out::default()).unwrap();
    assert_eq!(line.len(), 2);
    assert_eq!(parse_choice(line.as_str()), None);
    assert_eq!(line.display().to_string(), "\u{fffd}5");
}

#[test]
fn test_reader_echoes_tab_not_control_bytes() {
    let mut reader = LineReader::new(Bytes::new(b"1\t\x1b2\n"), true);
    let mut line = ConsoleLine::new();
    let mut out = Out::default();

    reader.read_line(&mut line, &mut out).unwrap();
    assert_eq!(out.text, "1\t2\n");
    assert_eq!(line.as_bytes(), b"1\t\x1b2");
}

#[test]
fn test_reader_echo() {
    let mut reader = LineReader::new(Bytes::new(b"12\x08\r"), true);
    let mut line = ConsoleLine::new();
    let mut out = Out::default();

    reader.read_line(&mut line, &mut out).unwrap();
    assert_eq!(out.text, "12\x08 \x08\n");
    assert!(out.flushes >= 3);
}

#[test]
fn test_reader_propagates_source_error() {
    let mut reader = LineReader::new(Bytes::new(b"12"), false);
    let mut line = ConsoleLine::new();

    assert_eq!(reader.read_line(&mut line, &mut Out::default()), Err(ConsoleError::Io));
}

struct Bytes(VecDeque<u8>);

impl Bytes {
    fn new(bytes: &[u8]) -> Self {
        Self(bytes.iter().copied().collect())
    }
}

impl ByteSource for Bytes {
    fn read_byte(&mut self) -> Result<u8, ConsoleError> {
        self.0.pop_front().ok_or(ConsoleError::Io)
    }
}

#[derive(Default)]
struct Out {
    text: String,
    flushes: usize,
}

impl core::fmt::Write for Out {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.text.push_str(s);
        Ok(())
    }
}

impl ConsoleOut for Out {
    fn flush(&mut self) {
        self.flushes += 1;
    }
}
