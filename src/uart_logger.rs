//! Diagnostic log output on a dedicated TX-only UART.
//!
//! Provides system logging via UART1 TX on GPIO6, separate from the
//! interactive console so log lines can never land inside a menu line.
//! Requires external USB-UART adapter (CH340, CP2102, etc).
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32-S3 GPIO6 (TX) ──────▶ USB-UART RX
//!                              └─▶ PC Serial Monitor
//! ```
//!
//! There is no drain task. The console task calls [`LogDrain::service`]
//! once per menu cycle with a fixed budget.

use core::fmt::Write;

use crate::logging::{LogEntry, LogStream};

#[cfg(target_os = "espidf")]
use crate::config::UartSpec;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripheral::Peripheral;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::uart::{self, UartTxDriver};

/// Destination for formatted log lines.
pub trait LogSink {
    fn write_line(&mut self, line: &[u8]);
}

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

/// Format log entry to string.
///
/// Format: `[tick] LEVEL source: message\n`
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    let mut writer = BufWriter { buf, pos: 0 };

    let _ = write!(
        writer,
        "[{:10}] {} {}: {}\n",
        entry.tick,
        entry.level.as_str(),
        entry.source,
        entry.message()
    );

    writer.pos
}

/// Moves entries from a [`LogStream`] to a [`LogSink`], a bounded batch at a time.
pub struct LogDrain<'a, const N: usize> {
    stream: &'a LogStream<N>,
    sink: &'a mut dyn LogSink,
    budget: usize,
}

impl<'a, const N: usize> LogDrain<'a, N> {
    pub fn new(stream: &'a LogStream<N>, sink: &'a mut dyn LogSink, budget: usize) -> Self {
        Self { stream, sink, budget }
    }

    /// Drain up to `budget` entries, then report drops if any.
    ///
    /// Returns the number of entries written.
    pub fn service(&mut self) -> usize {
        let mut format_buf = [0u8; 160];
        let mut written = 0;

        while written < self.budget {
            let Some(entry) = self.stream.drain() else {
                break;
            };
            let len = format_log_entry(&entry, &mut format_buf);
            self.sink.write_line(&format_buf[..len]);
            written += 1;
        }

        let dropped = self.stream.dropped();
        if dropped > 0 {
            let mut w = BufWriter { buf: &mut format_buf, pos: 0 };
            let _ = write!(w, "[WARN] log: dropped {}\n", dropped);
            let len = w.pos;
            self.sink.write_line(&format_buf[..len]);
            self.stream.reset_dropped();
        }

        written
    }
}

/// Initialize a TX-only UART for logging output.
#[cfg(target_os = "espidf")]
pub fn init_uart_logger<'d>(
    uart: impl Peripheral<P = uart::UART1> + 'd,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
    spec: &UartSpec,
) -> Result<UartTxDriver<'d>, esp_idf_svc::sys::EspError> {
    let uart_config = uart::config::Config::default()
        .baudrate(esp_idf_svc::hal::units::Hertz(spec.baud_rate));

    UartTxDriver::new(
        uart,
        tx_pin,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &uart_config,
    )
}

/// Log sink writing to the TX-only log UART.
#[cfg(target_os = "espidf")]
pub struct UartLogSink<'d> {
    uart: UartTxDriver<'d>,
}

#[cfg(target_os = "espidf")]
impl<'d> UartLogSink<'d> {
    pub fn new(uart: UartTxDriver<'d>) -> Self {
        Self { uart }
    }
}

#[cfg(target_os = "espidf")]
impl LogSink for UartLogSink<'_> {
    fn write_line(&mut self, line: &[u8]) {
        let _ = self.uart.write(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MAX_MSG_LEN};
    use std::string::String;
    use std::vec::Vec;

    struct VecSink(Vec<String>);

    impl LogSink for VecSink {
        fn write_line(&mut self, line: &[u8]) {
            self.0.push(String::from_utf8(line.to_vec()).unwrap());
        }
    }

    #[test]
    fn test_format_log_entry() {
        let entry = LogEntry {
            tick: 1234567,
            level: LogLevel::Info,
            source: "motor",
            len: 11,
            msg: {
                let mut msg = [0u8; MAX_MSG_LEN];
                msg[..11].copy_from_slice(b"Hello world");
                msg
            },
        };

        let mut buf = [0u8; 160];
        let len = format_log_entry(&entry, &mut buf);

        let formatted = core::str::from_utf8(&buf[..len]).unwrap();
        assert_eq!(formatted, "[   1234567] INFO motor: Hello world\n");
    }

    #[test]
    fn test_format_truncated_message() {
        let entry = LogEntry {
            tick: 999,
            level: LogLevel::Error,
            source: "console",
            len: 5,
            msg: {
                let mut msg = [0u8; MAX_MSG_LEN];
                msg[..10].copy_from_slice(b"TEST12345X"); // Only first 5 used
                msg
            },
        };

        let mut buf = [0u8; 160];
        let len = format_log_entry(&entry, &mut buf);

        let formatted = core::str::from_utf8(&buf[..len]).unwrap();
        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("TEST1"));
        assert!(!formatted.contains("X"));
    }

    #[test]
    fn test_drain_respects_budget() {
        let stream = LogStream::<8>::new();
        for i in 0..5 {
            stream.push(i, LogLevel::Info, "t", b"m");
        }

        let mut sink = VecSink(Vec::new());
        let mut drain = LogDrain::new(&stream, &mut sink, 3);

        assert_eq!(drain.service(), 3);
        assert_eq!(drain.service(), 2);
        assert_eq!(drain.service(), 0);
        assert_eq!(sink.0.len(), 5);
    }

    #[test]
    fn test_drain_reports_drops_once() {
        let stream = LogStream::<2>::new();
        for i in 0..4 {
            stream.push(i, LogLevel::Warn, "t", b"m");
        }

        let mut sink = VecSink(Vec::new());
        let mut drain = LogDrain::new(&stream, &mut sink, 8);
        drain.service();
        drain.service();

        assert_eq!(sink.0.len(), 3);
        assert_eq!(sink.0[2], "[WARN] log: dropped 2\n");
    }
}
