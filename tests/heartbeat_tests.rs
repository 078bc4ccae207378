//! Heartbeat task tests
//!
//! Time is simulated: the delay advances a clock instead of sleeping.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use dcmotor_bringup::config::{CONFIG, HEARTBEAT_PERIOD_MS};
use dcmotor_bringup::console::line_buffer::{ByteSource, ConsoleLine, LineReader};
use dcmotor_bringup::console::{ConsoleError, ConsoleOut};
use dcmotor_bringup::fault::{FaultCode, FaultState, Halt};
use dcmotor_bringup::heartbeat::{Heartbeat, HeartbeatPhase, StatusLed};
use dcmotor_bringup::task::{TaskDelay, TaskState, TaskStatus};

#[test]
fn test_period_is_constant() {
    let clock = Arc::new(AtomicU64::new(0));
    let fault = FaultState::new();
    let status = TaskStatus::new();
    let led = ClockLed { clock: clock.clone(), on: false, toggled_at: Vec::new() };
    let mut hb = Heartbeat::new(led, CONFIG.heartbeat_period_ms, &fault, &status);
    let mut delay = ClockDelay(clock);

    for _ in 0..20 {
        hb.step(&mut delay);
    }

    let times = &hb.led().toggled_at;
    assert_eq!(times.len(), 10);
    assert_eq!(times[0], 0);
    for pair in times.windows(2) {
        assert_eq!(pair[1] - pair[0], u64::from(HEARTBEAT_PERIOD_MS));
    }
}

#[test]
fn test_led_alternates() {
    let fault = FaultState::new();
    let status = TaskStatus::new();
    let led = ClockLed { clock: Arc::new(AtomicU64::new(0)), on: false, toggled_at: Vec::new() };
    let mut hb = Heartbeat::new(led, 500, &fault, &status);
    let mut delay = ClockDelay(Arc::new(AtomicU64::new(0)));

    hb.step(&mut delay);
    assert!(hb.led().on);
    assert_eq!(hb.phase(), HeartbeatPhase::Wait);
    assert_eq!(status.get(), TaskState::Running);

    hb.step(&mut delay);
    assert_eq!(status.get(), TaskState::Blocked);

    hb.step(&mut delay);
    assert!(!hb.led().on);
}

#[test]
fn test_runs_while_console_blocked() {
    let (tx, rx) = mpsc::channel::<u8>();
    let console_status = TaskStatus::new();
    let heartbeat_status = TaskStatus::new();
    let fault = FaultState::new();

    thread::scope(|s| {
        let console = s.spawn(|| {
            let mut reader = LineReader::new(Blocking(rx), false);
            let mut line = ConsoleLine::new();
            console_status.set(TaskState::Blocked);
            reader.read_line(&mut line, &mut Sink)
        });

        let clock = Arc::new(AtomicU64::new(0));
        let led = ClockLed { clock: clock.clone(), on: false, toggled_at: Vec::new() };
        let mut hb = Heartbeat::new(led, 500, &fault, &heartbeat_status);
        let mut delay = ClockDelay(clock.clone());
        for _ in 0..40 {
            hb.step(&mut delay);
        }

        assert_eq!(hb.toggles(), 20);
        assert_eq!(clock.load(Ordering::SeqCst), 20 * 500);

        drop(tx);
        assert_eq!(console.join().unwrap(), Err(ConsoleError::Io));
    });
}

#[test]
fn test_run_halts_on_fault() {
    let fault = FaultState::new();
    let status = TaskStatus::new();
    let led = ClockLed { clock: Arc::new(AtomicU64::new(0)), on: false, toggled_at: Vec::new() };
    let hb = Heartbeat::new(led, 500, &fault, &status);

    fault.latch(FaultCode::Assertion, 3);
    let result = catch_unwind(AssertUnwindSafe(|| hb.run(ClockDelay(Arc::new(AtomicU64::new(0))), &PanicHalt)));

    assert!(result.is_err());
    assert_eq!(status.get(), TaskState::Suspended);
}

struct ClockLed {
    clock: Arc<AtomicU64>,
    on: bool,
    toggled_at: Vec<u64>,
}

impl StatusLed for ClockLed {
    fn toggle(&mut self) {
        self.on = !self.on;
        self.toggled_at.push(self.clock.load(Ordering::SeqCst));
    }
}

struct ClockDelay(Arc<AtomicU64>);

impl TaskDelay for ClockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.0.fetch_add(u64::from(ms), Ordering::SeqCst);
    }
}

struct Blocking(mpsc::Receiver<u8>);

impl ByteSource for Blocking {
    fn read_byte(&mut self) -> Result<u8, ConsoleError> {
        self.0.recv().map_err(|_| ConsoleError::Io)
    }
}

struct Sink;

impl core::fmt::Write for Sink {
    fn write_str(&mut self, _s: &str) -> core::fmt::Result {
        Ok(())
    }
}

impl ConsoleOut for Sink {
    fn flush(&mut self) {}
}

struct PanicHalt;

impl Halt for PanicHalt {
    fn halt(&self) -> ! {
        panic!("halted")
    }
}
