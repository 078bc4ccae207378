//! Non-blocking diagnostic logging.
//!
//! # Architecture
//!
//! ```text
//! any task               LogStream             console task
//! ──────────             ─────────             ────────────
//!
//! log_info!() ─────────▶ [L0][L1][L2] ───────▶ LogDrain ──▶ log UART
//! bounded, no I/O         lock-free             bounded per cycle
//! ```
//!
//! # Rules
//!
//! - Logging never touches the console channel
//! - Push never blocks; a full ring drops the entry and counts it
//! - The heartbeat path does not log

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 96;

/// Log buffer size (number of entries).
pub const LOG_BUFFER_SIZE: usize = 32;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Convert from raw u8 value, saturating at `Trace`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
pub struct LogEntry {
    /// RTOS tick at push time.
    pub tick: u32,
    /// Log level.
    pub level: LogLevel,
    /// Subsystem that produced the entry.
    pub source: &'static str,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    pub const EMPTY: Self = Self {
        tick: 0,
        level: LogLevel::Info,
        source: "",
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message text.
    pub fn message(&self) -> &str {
        core::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<invalid utf8>")
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Lock-free log ring (multiple producers, single consumer).
///
/// - Producers reserve a slot with a compare-exchange on `write_idx`
/// - A slot becomes visible to the consumer once its `ready` flag is set
/// - Push never blocks (drops message if full)
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    entries: UnsafeCell<[LogEntry; N]>,
    ready: [AtomicBool; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
    max_level: AtomicU8,
}

// SAFETY: Each slot is written only by the producer that reserved it and
// read only by the single consumer after `ready` is published.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;
    const NOT_READY: AtomicBool = AtomicBool::new(false);

    /// Create a new empty log stream passing `Info` and above.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Log buffer size must be power of 2");

        Self {
            entries: UnsafeCell::new([LogEntry::EMPTY; N]),
            ready: [Self::NOT_READY; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            max_level: AtomicU8::new(LogLevel::Info as u8),
        }
    }

    /// Most verbose level accepted by [`push`](Self::push).
    #[inline]
    pub fn set_max_level(&self, level: LogLevel) {
        self.max_level.store(level as u8, Ordering::Relaxed);
    }

    #[inline]
    pub fn max_level(&self) -> LogLevel {
        LogLevel::from_u8(self.max_level.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level as u8 <= self.max_level.load(Ordering::Relaxed)
    }

    /// Push a log entry (never blocks).
    ///
    /// Returns `true` if the message was queued, `false` if filtered or
    /// dropped (ring full).
    pub fn push(&self, tick: u32, level: LogLevel, source: &'static str, msg: &[u8]) -> bool {
        if !self.enabled(level) {
            return false;
        }

        let write = loop {
            let write = self.write_idx.load(Ordering::Acquire);
            let read = self.read_idx.load(Ordering::Acquire);

            if write.wrapping_sub(read) >= N as u32 {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }

            if self
                .write_idx
                .compare_exchange_weak(write, write.wrapping_add(1), Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                break write;
            }
        };

        let idx = (write as usize) & Self::MASK;

        // SAFETY: slot `idx` was reserved above and the consumer will not
        // read it until `ready[idx]` is set.
        unsafe {
            let entry = &mut (*self.entries.get())[idx];
            entry.tick = tick;
            entry.level = level;
            entry.source = source;
            entry.len = msg.len().min(MAX_MSG_LEN) as u8;
            entry.msg[..entry.len as usize].copy_from_slice(&msg[..entry.len as usize]);
        }

        self.ready[idx].store(true, Ordering::Release);
        true
    }

    /// Drain next log entry (single consumer).
    ///
    /// Returns `None` if nothing is available, including when the oldest
    /// slot is still being written.
    pub fn drain(&self) -> Option<LogEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        let idx = (read as usize) & Self::MASK;
        if !self.ready[idx].load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: single consumer, slot published by its producer
        let entry = unsafe { (*self.entries.get())[idx] };

        self.ready[idx].store(false, Ordering::Relaxed);
        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Get count of dropped messages.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Reset dropped counter (e.g., after reporting).
    #[inline]
    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a message into a buffer, truncating.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    use core::fmt::Write;

    struct BufWriter<'a> {
        buf: &'a mut [u8],
        pos: usize,
    }

    impl Write for BufWriter<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let bytes = s.as_bytes();
            let remaining = self.buf.len() - self.pos;
            let to_write = bytes.len().min(remaining);
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
            Ok(())
        }
    }

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

/// Log macro.
///
/// # Example
///
/// ```ignore
/// log!(LogLevel::Info, LOG_STREAM, "motor", "duty {}", duty);
/// ```
#[macro_export]
macro_rules! log {
    ($level:expr, $stream:expr, $source:expr, $($arg:tt)*) => {{
        if $stream.enabled($level) {
            let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
            let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
            $stream.push($crate::log_globals::now_ticks(), $level, $source, &buf[..len]);
        }
    }};
}

/// Info log.
#[macro_export]
macro_rules! log_info {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::log!($crate::logging::LogLevel::Info, $stream, $source, $($arg)*)
    };
}

/// Warning log.
#[macro_export]
macro_rules! log_warn {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::log!($crate::logging::LogLevel::Warn, $stream, $source, $($arg)*)
    };
}

/// Error log.
#[macro_export]
macro_rules! log_error {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::log!($crate::logging::LogLevel::Error, $stream, $source, $($arg)*)
    };
}

/// Debug log.
#[macro_export]
macro_rules! log_debug {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::log!($crate::logging::LogLevel::Debug, $stream, $source, $($arg)*)
    };
}

/// Trace log (maximum verbosity).
#[macro_export]
macro_rules! log_trace {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::log!($crate::logging::LogLevel::Trace, $stream, $source, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_stream_basic() {
        let stream = LogStream::<16>::new();

        assert!(stream.push(1000, LogLevel::Info, "test", b"test message"));

        let entry = stream.drain().unwrap();
        assert_eq!(entry.tick, 1000);
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.source, "test");
        assert_eq!(entry.message(), "test message");

        assert!(stream.drain().is_none());
    }

    #[test]
    fn test_log_stream_full() {
        let stream = LogStream::<4>::new();

        assert!(stream.push(1, LogLevel::Info, "t", b"1"));
        assert!(stream.push(2, LogLevel::Info, "t", b"2"));
        assert!(stream.push(3, LogLevel::Info, "t", b"3"));
        assert!(stream.push(4, LogLevel::Info, "t", b"4"));

        // Should drop
        assert!(!stream.push(5, LogLevel::Info, "t", b"5"));
        assert_eq!(stream.dropped(), 1);

        // Drain one, should be able to push again
        assert_eq!(stream.drain().unwrap().tick, 1);
        assert!(stream.push(6, LogLevel::Info, "t", b"6"));

        let ticks: std::vec::Vec<u32> = core::iter::from_fn(|| stream.drain()).map(|e| e.tick).collect();
        assert_eq!(ticks, [2, 3, 4, 6]);
    }

    #[test]
    fn test_level_filter() {
        let stream = LogStream::<4>::new();

        assert!(!stream.push(1, LogLevel::Debug, "t", b"hidden"));
        assert_eq!(stream.dropped(), 0);

        stream.set_max_level(LogLevel::Trace);
        assert!(stream.push(2, LogLevel::Debug, "t", b"shown"));
        assert_eq!(stream.max_level(), LogLevel::Trace);
    }

    #[test]
    fn test_format_to_buffer() {
        let mut buf = [0u8; 32];
        let len = format_to_buffer(&mut buf, format_args!("Hello {}", 42));
        assert_eq!(&buf[..len], b"Hello 42");
    }

    #[test]
    fn test_format_to_buffer_truncates() {
        let mut buf = [0u8; 4];
        let len = format_to_buffer(&mut buf, format_args!("{}", 123456));
        assert_eq!(&buf[..len], b"1234");
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_multiple_producers() {
        use std::sync::Arc;
        use std::thread;

        let stream = Arc::new(LogStream::<64>::new());
        let mut handles = std::vec![];

        for i in 0..4 {
            let stream = Arc::clone(&stream);
            handles.push(thread::spawn(move || {
                for j in 0..10 {
                    let msg = std::format!("task {} msg {}", i, j);
                    stream.push(j, LogLevel::Info, "t", msg.as_bytes());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let mut count = 0;
        while let Some(entry) = stream.drain() {
            assert!(entry.message().starts_with("task "));
            count += 1;
        }
        assert_eq!(count, 40, "All messages should be present");
    }
}
