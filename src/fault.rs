//! Fault sentinel for the bring-up harness.
//!
//! # Philosophy
//!
//! > A halted board can be inspected. A board running on a corrupted
//! > stack can only make things worse.
//!
//! Every fatal path ends in a function returning `!`. There is no
//! recovery entry point and no way to clear a latched fault.
//!
//! Two entry points exist:
//!
//! - **Assertion failure**: the location is reported on the console channel
//!   with preemption suppressed, then the system halts.
//! - **Stack overflow**: the fault LED is latched and the system halts.
//!   No text is produced, the detecting context may be running on a
//!   smashed stack.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::config::FaultHooksConfig;
use crate::console::channel::{ConsoleChannel, ConsolePort, Exclusive, FaultPort};

/// Fault codes indicating why the board stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// No fault (normal operation).
    None = 0,

    /// An invariant check failed. Data holds the source line.
    Assertion = 1,

    /// The RTOS detected a task stack overflow.
    StackOverflow = 2,

    /// The scheduler returned control to the bootstrap.
    SchedulerReturned = 3,
}

impl FaultCode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultCode::Assertion,
            2 => FaultCode::StackOverflow,
            3 => FaultCode::SchedulerReturned,
            _ => FaultCode::None,
        }
    }
}

/// Latched fault state.
///
/// Set exactly once by the sentinel. Task loops poll it so that a task
/// on another core cannot keep running past a halt, and a debugger can
/// read it after the fact.
pub struct FaultState {
    /// True once a fault has been latched. Never cleared.
    active: AtomicBool,

    /// Fault code (reason for the halt).
    code: AtomicU8,

    /// Additional data (source line for assertions).
    data: AtomicU32,

    /// Number of sentinel entries, including ones that lost the race.
    entries: AtomicU32,
}

impl FaultState {
    /// Create new fault state (no fault).
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
            data: AtomicU32::new(0),
            entries: AtomicU32::new(0),
        }
    }

    /// Latch a fault.
    ///
    /// Returns `true` for the first caller only. Later callers still count
    /// as entries but must not report, the first one owns the console.
    #[inline]
    pub fn latch(&self, code: FaultCode, data: u32) -> bool {
        self.entries.fetch_add(1, Ordering::Relaxed);
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.code.store(code as u8, Ordering::Release);
        self.data.store(data, Ordering::Release);
        true
    }

    /// Check if a fault has been latched.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Get fault code (only meaningful if `is_active()` is true).
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    /// Get fault data (meaning depends on fault code).
    #[inline]
    pub fn data(&self) -> u32 {
        self.data.load(Ordering::Acquire)
    }

    /// Get number of sentinel entries since boot.
    #[inline]
    pub fn entries(&self) -> u32 {
        self.entries.load(Ordering::Relaxed)
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

/// Source location of a failed check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultLocation {
    pub file: &'static str,
    pub line: u32,
}

impl FaultLocation {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for FaultLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// What brought the sentinel in. Lives on the caller's stack only.
#[derive(Clone, Copy, Debug)]
pub enum FaultRecord<'a> {
    Assertion(FaultLocation),
    StackOverflow { task: &'a str },
}

/// Persistent hardware signal distinct from the heartbeat LED.
pub trait FaultIndicator {
    /// Drive the indicator on. Must not allocate, log or block.
    fn latch(&self);
}

/// The terminal operation every fatal path ends in.
pub trait Halt {
    fn halt(&self) -> !;
}

/// Spin forever. Used where nothing better than stopping is available,
/// e.g. after the scheduler returned.
#[inline(never)]
pub fn fatal_halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

/// Optional RTOS hooks.
///
/// The default methods do nothing, which is what a build without the
/// corresponding check compiled in would do. [`FaultSentinel`] overrides
/// both and diverges when the hook is enabled in [`FaultHooksConfig`].
pub trait FaultHooks {
    fn assertion_failed(&self, _location: FaultLocation) {}

    fn stack_overflow(&self, _task: &str) {}
}

/// Hooks that ignore every report.
pub struct NoHooks;

impl FaultHooks for NoHooks {}

/// Terminal fault handler.
///
/// Holds explicit references to the shared console channel and the fault
/// latch rather than reaching for globals.
pub struct FaultSentinel<'a, P, F, X> {
    channel: &'a ConsoleChannel<P, F, X>,
    state: &'a FaultState,
    indicator: &'a (dyn FaultIndicator + Sync),
    halt: &'a (dyn Halt + Sync),
    hooks: FaultHooksConfig,
}

impl<'a, P, F, X> FaultSentinel<'a, P, F, X>
where
    P: ConsolePort,
    F: FaultPort,
    X: Exclusive,
{
    pub const fn new(
        channel: &'a ConsoleChannel<P, F, X>,
        state: &'a FaultState,
        indicator: &'a (dyn FaultIndicator + Sync),
        halt: &'a (dyn Halt + Sync),
        hooks: FaultHooksConfig,
    ) -> Self {
        Self { channel, state, indicator, halt, hooks }
    }

    /// Fault latch this sentinel writes to.
    pub fn state(&self) -> &'a FaultState {
        self.state
    }

    /// Enter the sentinel. Never returns.
    pub fn enter(&self, record: FaultRecord<'_>) -> ! {
        match record {
            FaultRecord::Assertion(location) => self.report_assertion(location),
            FaultRecord::StackOverflow { task } => self.report_stack_overflow(task),
        }
    }

    /// Report `*** ASSERT => file:line` under preemption suppression and halt
    /// without lifting it.
    ///
    /// Only the first entrant writes; a second task failing a check while
    /// the first is reporting goes straight to halt.
    pub fn report_assertion(&self, location: FaultLocation) -> ! {
        if self.state.latch(FaultCode::Assertion, location.line) {
            self.channel.report_and_halt(
                |out| {
                    let _ = writeln!(out, "*** ASSERT => {}", location);
                },
                self.halt,
            )
        }
        self.channel.seal();
        self.halt.halt()
    }

    /// Latch the fault LED and halt. No console I/O.
    pub fn report_stack_overflow(&self, _task: &str) -> ! {
        self.state.latch(FaultCode::StackOverflow, 0);
        self.indicator.latch();
        self.channel.seal();
        self.halt.halt()
    }
}

impl<P, F, X> FaultHooks for FaultSentinel<'_, P, F, X>
where
    P: ConsolePort,
    F: FaultPort,
    X: Exclusive,
{
    fn assertion_failed(&self, location: FaultLocation) {
        if self.hooks.assert_report {
            self.enter(FaultRecord::Assertion(location))
        }
    }

    fn stack_overflow(&self, task: &str) {
        if self.hooks.stack_overflow {
            self.enter(FaultRecord::StackOverflow { task })
        }
    }
}

/// Check an invariant, routing failures through a [`FaultHooks`] impl.
///
/// ```ignore
/// fault_assert!(SENTINEL, line.len() <= MAX_LINE_CHARS);
/// ```
#[macro_export]
macro_rules! fault_assert {
    ($hooks:expr, $cond:expr) => {{
        if !$cond {
            $crate::fault::FaultHooks::assertion_failed(
                &$hooks,
                $crate::fault::FaultLocation::new(file!(), line!()),
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_state_basic() {
        let fault = FaultState::new();

        assert!(!fault.is_active());
        assert_eq!(fault.code(), FaultCode::None);
        assert_eq!(fault.entries(), 0);

        assert!(fault.latch(FaultCode::Assertion, 42));

        assert!(fault.is_active());
        assert_eq!(fault.code(), FaultCode::Assertion);
        assert_eq!(fault.data(), 42);
        assert_eq!(fault.entries(), 1);
    }

    #[test]
    fn test_second_latch_keeps_first_fault() {
        let fault = FaultState::new();

        assert!(fault.latch(FaultCode::StackOverflow, 0));
        assert!(!fault.latch(FaultCode::Assertion, 7));

        assert_eq!(fault.code(), FaultCode::StackOverflow);
        assert_eq!(fault.data(), 0);
        assert_eq!(fault.entries(), 2);
    }

    #[test]
    fn test_location_display() {
        let loc = FaultLocation::new("src/console/console.rs", 120);
        assert_eq!(std::format!("{}", loc), "src/console/console.rs:120");
    }

    #[test]
    fn test_no_hooks_returns() {
        let hooks = NoHooks;
        hooks.assertion_failed(FaultLocation::new("x.rs", 1));
        hooks.stack_overflow("LED");
        crate::fault_assert!(hooks, 1 + 1 == 3);
    }
}
