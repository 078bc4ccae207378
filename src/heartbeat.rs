//! Heartbeat task: blink an LED at a fixed period.
//!
//! Needs nothing but the LED and a delay. It never writes to the console
//! and never logs, so nothing the console does can stretch its period.

use crate::fault::{FaultState, Halt};
use crate::task::{TaskDelay, TaskState, TaskStatus};

/// Binary output driven by the heartbeat.
pub trait StatusLed {
    fn toggle(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartbeatPhase {
    Toggle,
    Wait,
}

pub struct Heartbeat<'a, L> {
    led: L,
    period_ms: u32,
    phase: HeartbeatPhase,
    toggles: u32,
    fault: &'a FaultState,
    status: &'a TaskStatus,
}

impl<'a, L: StatusLed> Heartbeat<'a, L> {
    pub fn new(led: L, period_ms: u32, fault: &'a FaultState, status: &'a TaskStatus) -> Self {
        Self {
            led,
            period_ms,
            phase: HeartbeatPhase::Toggle,
            toggles: 0,
            fault,
            status,
        }
    }

    pub fn phase(&self) -> HeartbeatPhase {
        self.phase
    }

    /// Number of toggles since start.
    pub fn toggles(&self) -> u32 {
        self.toggles
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    /// Run the current phase. Returns the phase that ran, or `None` once a
    /// fault is latched.
    pub fn step<D: TaskDelay>(&mut self, delay: &mut D) -> Option<HeartbeatPhase> {
        if self.fault.is_active() {
            self.status.set(TaskState::Suspended);
            return None;
        }

        let ran = self.phase;
        match ran {
            HeartbeatPhase::Toggle => {
                self.status.set(TaskState::Running);
                self.led.toggle();
                self.toggles = self.toggles.wrapping_add(1);
                self.phase = HeartbeatPhase::Wait;
            }
            HeartbeatPhase::Wait => {
                self.status.set(TaskState::Blocked);
                delay.delay_ms(self.period_ms);
                self.phase = HeartbeatPhase::Toggle;
            }
        }
        Some(ran)
    }

    pub fn run<D: TaskDelay>(mut self, mut delay: D, halt: &dyn Halt) -> ! {
        loop {
            if self.step(&mut delay).is_none() {
                halt.halt();
            }
        }
    }
}
