//! Shared console channel.
//!
//! The console UART is written by exactly two parties: the console task
//! during normal operation and the fault sentinel once something fatal
//! happened. The channel is the single serialization point between them.
//!
//! ```text
//! Console task ──ChannelWriter──▶ write() ──▶ ConsolePort (driver, may block)
//!                                   │ line()
//! Fault sentinel ───────────────▶ report() ─▶ FaultPort (polled, ISR-safe)
//!                                   │ report() = preemption suppressed
//! ```
//!
//! Normal writes never suppress preemption. A report does, for its own
//! duration only, and seals the channel so nothing is written after it.

use core::cell::UnsafeCell;
use core::convert::Infallible;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use heapless::String;

use crate::fault::Halt;

/// Size of the staging buffer used by [`ChannelWriter`].
pub const OUTPUT_LINE_SIZE: usize = 96;

/// Console transport used during normal operation.
pub trait ConsolePort {
    /// Write all bytes. May block the calling task.
    fn write_all(&mut self, bytes: &[u8]);

    /// Push buffered bytes to the wire.
    fn flush(&mut self) {}
}

/// Transport used by the fault sentinel.
///
/// Must work with preemption (and possibly interrupts) disabled: no
/// semaphores, no allocation, busy-wait only.
pub trait FaultPort {
    fn write_polled(&self, bytes: &[u8]);
}

/// Platform exclusion primitive.
pub trait Exclusive {
    /// Serialize one console line against a fault report.
    ///
    /// On a single core where reports suppress preemption this is a plain
    /// call; host builds back it with a lock.
    fn line<R>(&self, f: impl FnOnce() -> R) -> R;

    /// Run `f` with preemption suppressed. `f` may diverge, in which case
    /// suppression is never lifted.
    fn report<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// Console stream shared by the console task and the fault sentinel.
pub struct ConsoleChannel<P, F, X> {
    port: UnsafeCell<P>,
    fault_port: F,
    guard: X,
    /// A normal writer currently owns `port`.
    writing: AtomicBool,
    /// Last byte written was not a newline.
    line_open: AtomicBool,
    /// A fault was reported. All further output is dropped.
    sealed: AtomicBool,
    /// Writes dropped because the channel was sealed or contended.
    dropped: AtomicU32,
}

// SAFETY: `port` is only touched between a successful `writing`
// compare-exchange and the matching release, so at most one `&mut P`
// exists at a time. The fault path never touches `port`, it writes through
// `fault_port` (shared, `&self`) instead.
unsafe impl<P: Send, F: Sync, X: Sync> Sync for ConsoleChannel<P, F, X> {}

impl<P, F, X> ConsoleChannel<P, F, X>
where
    P: ConsolePort,
    F: FaultPort,
    X: Exclusive,
{
    pub const fn new(port: P, fault_port: F, guard: X) -> Self {
        Self {
            port: UnsafeCell::new(port),
            fault_port,
            guard,
            writing: AtomicBool::new(false),
            line_open: AtomicBool::new(false),
            sealed: AtomicBool::new(false),
            dropped: AtomicU32::new(0),
        }
    }

    /// Write a chunk of output as one unit.
    ///
    /// Chunks are whole lines except for prompts and echoed keystrokes.
    /// Returns `false` if the chunk was dropped.
    pub fn write(&self, bytes: &[u8]) -> bool {
        if bytes.is_empty() {
            return true;
        }

        self.guard.line(|| {
            if self.sealed.load(Ordering::Acquire) {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }

            if self
                .writing
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }

            // SAFETY: `writing` was false and is now ours; see the Sync impl.
            let port = unsafe { &mut *self.port.get() };
            port.write_all(bytes);
            port.flush();

            let open = bytes.last() != Some(&b'\n');
            self.line_open.store(open, Ordering::Relaxed);
            self.writing.store(false, Ordering::Release);
            true
        })
    }

    /// Write a fault report with preemption suppressed, seal, then halt.
    ///
    /// `halt` runs inside the exclusive section, which is therefore never
    /// left: nothing queued before the report can reach the wire after it.
    /// If a console line is open (a prompt, or a write preempted half way)
    /// the report starts on a fresh line.
    pub fn report_and_halt(&self, f: impl FnOnce(&mut dyn fmt::Write), halt: &dyn Halt) -> ! {
        let never: Infallible = self.guard.report(|| -> Infallible {
            self.sealed.store(true, Ordering::Release);

            if self.line_open.load(Ordering::Relaxed) || self.writing.load(Ordering::Acquire) {
                self.fault_port.write_polled(b"\n");
            }

            let mut out = PolledWriter { port: &self.fault_port };
            f(&mut out);
            self.line_open.store(false, Ordering::Relaxed);
            halt.halt()
        });
        match never {}
    }

    /// Drop all further output without writing anything.
    #[inline]
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Number of writes dropped so far.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Formatting writer that stages output per line.
    pub fn writer(&self) -> ChannelWriter<'_, P, F, X> {
        ChannelWriter { channel: self, pending: String::new() }
    }
}

struct PolledWriter<'a, F> {
    port: &'a F,
}

impl<F: FaultPort> fmt::Write for PolledWriter<'_, F> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.port.write_polled(s.as_bytes());
        Ok(())
    }
}

/// `fmt::Write` front end for [`ConsoleChannel`].
///
/// Output is staged until a newline or an explicit [`flush`], so each
/// completed line reaches the port in a single `write`.
///
/// [`flush`]: ChannelWriter::flush
pub struct ChannelWriter<'a, P, F, X> {
    channel: &'a ConsoleChannel<P, F, X>,
    pending: String<OUTPUT_LINE_SIZE>,
}

impl<P, F, X> ChannelWriter<'_, P, F, X>
where
    P: ConsolePort,
    F: FaultPort,
    X: Exclusive,
{
    /// Send whatever is staged, even without a trailing newline.
    pub fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.channel.write(self.pending.as_bytes());
            self.pending.clear();
        }
    }

    fn stage(&mut self, s: &str) {
        for c in s.chars() {
            if self.pending.push(c).is_err() {
                // Over-long line: ship what we have, keep going
                self.flush();
                let _ = self.pending.push(c);
            }
        }
    }
}

impl<P, F, X> fmt::Write for ChannelWriter<'_, P, F, X>
where
    P: ConsolePort,
    F: FaultPort,
    X: Exclusive,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut rest = s;
        while let Some(pos) = rest.find('\n') {
            self.stage(&rest[..=pos]);
            self.flush();
            rest = &rest[pos + 1..];
        }
        self.stage(rest);
        Ok(())
    }
}
