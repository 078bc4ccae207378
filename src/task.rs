//! Task descriptors and the narrow RTOS interface the core depends on.
//!
//! The core never calls FreeRTOS directly. Bootstrap goes through [`Rtos`],
//! the heartbeat through [`TaskDelay`], the console through
//! [`HeapMonitor`]. The ESP-IDF implementations live in `hal::rtos`.

use core::sync::atomic::{AtomicU8, Ordering};

/// Static description of one task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskSpec {
    /// Task name as shown by the RTOS (max 15 chars on FreeRTOS).
    pub name: &'static str,
    /// Higher preempts lower. Idle is 0.
    pub priority: u8,
    /// Stack budget in bytes. Fixed at creation.
    pub stack_bytes: u32,
    /// Core affinity, `None` lets the scheduler choose.
    pub core: Option<u8>,
}

/// Task entry routine. Tasks never return.
pub type TaskEntry = fn() -> !;

/// Lifecycle of a task as seen by the harness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    Ready = 0,
    Running = 1,
    Blocked = 2,
    Suspended = 3,
}

impl TaskState {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => TaskState::Running,
            2 => TaskState::Blocked,
            3 => TaskState::Suspended,
            _ => TaskState::Ready,
        }
    }
}

/// Lock-free cell a task publishes its state into.
///
/// Written only by the owning task (and by bootstrap before the task
/// exists), read by anyone.
pub struct TaskStatus {
    state: AtomicU8,
}

impl TaskStatus {
    pub const fn new() -> Self {
        Self { state: AtomicU8::new(TaskState::Ready as u8) }
    }

    #[inline]
    pub fn set(&self, state: TaskState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn get(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Free-heap query. Observational only.
pub trait HeapMonitor {
    fn free_heap(&self) -> u32;
}

/// Timed suspension of the calling task.
pub trait TaskDelay {
    /// Block the calling task for `ms` milliseconds without spinning.
    fn delay_ms(&mut self, ms: u32);
}

/// Task creation and scheduler hand-off.
pub trait Rtos: HeapMonitor {
    type Error: core::fmt::Debug;

    /// Create a task. It may start running before this returns.
    fn spawn(&mut self, spec: &TaskSpec, entry: TaskEntry) -> Result<(), Self::Error>;

    /// Hand the CPU to the scheduler for good.
    ///
    /// A correct configuration never returns from here. Any return,
    /// `Ok` included, is treated as fatal by the caller.
    fn start_scheduler(&mut self) -> Result<(), Self::Error>;
}
