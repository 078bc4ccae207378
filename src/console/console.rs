//! Console task state machine

use core::fmt::Write;

use super::commands::{self, HandlerContext};
use super::io::ConsoleIo;
use super::line_buffer::ConsoleLine;
use super::parser::parse_choice;
use super::ConsoleError;
use crate::fault::{FaultState, Halt};
use crate::log_globals::LOG_STREAM;
use crate::log_warn;
use crate::logging::LOG_BUFFER_SIZE;
use crate::motor::MotorSubsystem;
use crate::task::{HeapMonitor, TaskState, TaskStatus};
use crate::uart_logger::LogDrain;

/// Console loop states.
///
/// ```text
/// RenderMenu ─▶ AwaitInput ─▶ Parse ─▶ Dispatch ─▶ RenderMenu
///                    │          │          │
///                    └──────────┴──────────┴──▶ Report ─▶ RenderMenu
/// ```
///
/// `AwaitInput` is the only suspension point of the loop itself; a
/// handler running under `Dispatch` may block on further input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleState {
    RenderMenu,
    AwaitInput,
    Parse,
    Dispatch(i32),
    Report(ConsoleError),
    /// A fault was latched. Terminal.
    Halted,
}

/// The interactive test menu task.
pub struct ConsoleTask<'a, IO, M, H> {
    io: IO,
    motor: M,
    heap: &'a H,
    fault: &'a FaultState,
    status: &'a TaskStatus,
    logs: Option<LogDrain<'a, LOG_BUFFER_SIZE>>,
    line: ConsoleLine,
    state: ConsoleState,
}

impl<'a, IO, M, H> ConsoleTask<'a, IO, M, H>
where
    IO: ConsoleIo,
    M: MotorSubsystem,
    H: HeapMonitor,
{
    pub fn new(io: IO, motor: M, heap: &'a H, fault: &'a FaultState, status: &'a TaskStatus) -> Self {
        Self {
            io,
            motor,
            heap,
            fault,
            status,
            logs: None,
            line: ConsoleLine::new(),
            state: ConsoleState::RenderMenu,
        }
    }

    /// Service the diagnostic log at the top of every menu cycle.
    pub fn with_log_drain(mut self, drain: LogDrain<'a, LOG_BUFFER_SIZE>) -> Self {
        self.logs = Some(drain);
        self
    }

    pub fn state(&self) -> ConsoleState {
        self.state
    }

    /// Last line read from the operator, including input read by a
    /// handler.
    pub fn line(&self) -> &ConsoleLine {
        &self.line
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }

    /// Run one state and move to the next. Returns the new state.
    pub fn step(&mut self) -> ConsoleState {
        if self.fault.is_active() {
            self.status.set(TaskState::Suspended);
            self.state = ConsoleState::Halted;
            return self.state;
        }

        self.status.set(TaskState::Running);
        self.state = match self.state {
            ConsoleState::RenderMenu => self.render_menu(),
            ConsoleState::AwaitInput => self.await_input(),
            ConsoleState::Parse => self.parse(),
            ConsoleState::Dispatch(choice) => self.dispatch(choice),
            ConsoleState::Report(err) => self.report(err),
            ConsoleState::Halted => ConsoleState::Halted,
        };
        self.state
    }

    /// Run forever. Halts once a fault is latched.
    pub fn run(mut self, halt: &dyn Halt) -> ! {
        loop {
            if self.step() == ConsoleState::Halted {
                halt.halt();
            }
        }
    }

    fn render_menu(&mut self) -> ConsoleState {
        if let Some(logs) = self.logs.as_mut() {
            logs.service();
        }

        commands::print_menu(&mut self.io, self.heap.free_heap());
        let _ = write!(self.io, "Enter choice : ");
        ConsoleState::AwaitInput
    }

    fn await_input(&mut self) -> ConsoleState {
        self.status.set(TaskState::Blocked);
        let result = self.io.read_line(&mut self.line);
        self.status.set(TaskState::Running);

        match result {
            Ok(()) => ConsoleState::Parse,
            Err(err) => ConsoleState::Report(err),
        }
    }

    fn parse(&mut self) -> ConsoleState {
        match parse_choice(self.line.as_str()) {
            Some(choice) => ConsoleState::Dispatch(choice),
            None => ConsoleState::Report(ConsoleError::IllegalChoice),
        }
    }

    fn dispatch(&mut self, choice: i32) -> ConsoleState {
        let mut ctx = HandlerContext {
            motor: &mut self.motor,
            io: &mut self.io,
            line: &mut self.line,
        };

        match commands::dispatch(choice, &mut ctx) {
            Ok(()) => ConsoleState::RenderMenu,
            Err(err) => ConsoleState::Report(err),
        }
    }

    fn report(&mut self, err: ConsoleError) -> ConsoleState {
        match err {
            ConsoleError::IllegalChoice => {
                let _ = writeln!(self.io, "*** Illegal choice : {}", self.line.display());
            }
            ConsoleError::InvalidValue => {
                let _ = writeln!(self.io, "*** {} : {}", err, self.line.display());
                log_warn!(LOG_STREAM, "console", "{}", err);
            }
            other => {
                let _ = writeln!(self.io, "*** {}", other);
                log_warn!(LOG_STREAM, "console", "{}", other);
            }
        }
        ConsoleState::RenderMenu
    }
}
