//! FreeRTOS glue: task creation, delays, preemption control and halt.

use core::ffi::{c_void, CStr};

use esp_idf_svc::hal::cpu::Core;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::task::{self, CriticalSection};
use esp_idf_svc::sys::{self, EspError};

use crate::console::channel::Exclusive;
use crate::fault::{fatal_halt, Halt};
use crate::task::{HeapMonitor, Rtos, TaskDelay, TaskEntry, TaskSpec};

/// Task name buffer, FreeRTOS copies at most 15 characters.
const TASK_NAME_LEN: usize = 16;

/// FreeRTOS as seen by the bootstrap.
///
/// ESP-IDF starts the scheduler before `main` runs. To keep the created
/// tasks from running until the hand-off, `new` raises the calling task
/// above every application priority; [`Rtos::start_scheduler`] then deletes
/// the calling task.
pub struct EspRtos {
    _private: (),
}

impl EspRtos {
    pub fn new() -> Self {
        unsafe {
            sys::vTaskPrioritySet(core::ptr::null_mut(), sys::configMAX_PRIORITIES - 1);
        }
        Self { _private: () }
    }
}

impl HeapMonitor for EspRtos {
    fn free_heap(&self) -> u32 {
        unsafe { sys::esp_get_free_heap_size() }
    }
}

extern "C" fn task_trampoline(arg: *mut c_void) {
    // SAFETY: `arg` is the `TaskEntry` handed to `spawn`.
    let entry = unsafe { core::mem::transmute::<*mut c_void, TaskEntry>(arg) };
    entry()
}

impl Rtos for EspRtos {
    type Error = EspError;

    fn spawn(&mut self, spec: &TaskSpec, entry: TaskEntry) -> Result<(), EspError> {
        let mut name = [0u8; TASK_NAME_LEN];
        let len = spec.name.len().min(TASK_NAME_LEN - 1);
        name[..len].copy_from_slice(&spec.name.as_bytes()[..len]);
        let Ok(name) = CStr::from_bytes_until_nul(&name) else {
            return sys::esp!(sys::ESP_ERR_INVALID_ARG as sys::esp_err_t);
        };

        let core = spec.core.map(|c| if c == 0 { Core::Core0 } else { Core::Core1 });

        unsafe {
            task::create(
                task_trampoline,
                name,
                spec.stack_bytes as usize,
                entry as *mut c_void,
                spec.priority,
                core,
            )?;
        }
        Ok(())
    }

    fn start_scheduler(&mut self) -> Result<(), EspError> {
        unsafe {
            sys::vTaskDelete(core::ptr::null_mut());
        }
        Ok(())
    }
}

/// Free heap without the priority change of [`EspRtos::new`].
pub struct EspHeap;

impl HeapMonitor for EspHeap {
    fn free_heap(&self) -> u32 {
        unsafe { sys::esp_get_free_heap_size() }
    }
}

/// Blocking delay that yields to the scheduler.
pub struct RtosDelay;

impl TaskDelay for RtosDelay {
    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}

/// Exclusion for the console channel.
///
/// Lines need no lock, the channel's own claim flag serializes them.
/// Fault reports run in a critical section: interrupts masked on this
/// core, the other core held off the same spinlock. The report halts
/// inside it, so the UART TX interrupt never runs again afterwards.
pub struct PreemptionGuard {
    cs: CriticalSection,
}

impl PreemptionGuard {
    pub const fn new() -> Self {
        Self { cs: CriticalSection::new() }
    }
}

impl Exclusive for PreemptionGuard {
    fn line<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }

    fn report<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.cs.enter();
        f()
    }
}

static HALT_SECTION: CriticalSection = CriticalSection::new();

/// Enter a critical section that is never left, then spin.
pub struct CriticalHalt;

impl Halt for CriticalHalt {
    fn halt(&self) -> ! {
        core::mem::forget(HALT_SECTION.enter());
        fatal_halt()
    }
}
