//! Scheduler bootstrap.
//!
//! Creates the two application tasks and hands the CPU to the scheduler.
//! Returning from the hand-off is itself a fault with no better remedy
//! than spinning.

use core::fmt::{self, Write};

use crate::fault::{fatal_halt, FaultCode, FaultState};
use crate::log_error;
use crate::log_globals::LOG_STREAM;
use crate::task::{Rtos, TaskEntry, TaskSpec, TaskState, TaskStatus};

/// Version string (set by build.rs, includes git hash)
pub const VERSION: &str = env!("VERSION_STRING");

/// One task to create.
pub struct TaskPlan<'a> {
    pub spec: TaskSpec,
    pub entry: TaskEntry,
    pub status: &'a TaskStatus,
}

/// Why [`launch`] came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchError {
    /// The RTOS refused to create a task (out of heap, bad priority).
    TaskCreate { task: &'static str },
    /// The scheduler could not be started.
    SchedulerStart,
    /// The scheduler returned after starting.
    SchedulerReturned,
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskCreate { task } => write!(f, "cannot create task {}", task),
            Self::SchedulerStart => write!(f, "scheduler start failed"),
            Self::SchedulerReturned => write!(f, "scheduler returned"),
        }
    }
}

/// Print the banner, create both tasks, report free heap, start the
/// scheduler.
///
/// Only returns if something went wrong; the result says what.
pub fn launch<R: Rtos>(rtos: &mut R, out: &mut dyn Write, tasks: &[TaskPlan<'_>; 2]) -> LaunchError {
    let _ = writeln!(out);
    let _ = writeln!(out, "{} - started", VERSION);

    for plan in tasks {
        plan.status.set(TaskState::Ready);
        if let Err(e) = rtos.spawn(&plan.spec, plan.entry) {
            log_error!(LOG_STREAM, "boot", "spawn {} failed: {:?}", plan.spec.name, e);
            return LaunchError::TaskCreate { task: plan.spec.name };
        }
    }

    let _ = writeln!(out, "heap-free: {}", rtos.free_heap());

    match rtos.start_scheduler() {
        Ok(()) => LaunchError::SchedulerReturned,
        Err(e) => {
            log_error!(LOG_STREAM, "boot", "scheduler: {:?}", e);
            LaunchError::SchedulerStart
        }
    }
}

/// [`launch`], then halt forever if it ever comes back.
///
/// The failure is latched in `fault` for a debugger; nothing is printed.
pub fn run<R: Rtos>(rtos: &mut R, out: &mut dyn Write, tasks: &[TaskPlan<'_>; 2], fault: &FaultState) -> ! {
    let err = launch(rtos, out, tasks);
    log_error!(LOG_STREAM, "boot", "{}", err);
    fault.latch(FaultCode::SchedulerReturned, 0);
    fatal_halt()
}
