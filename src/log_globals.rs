//! Global log stream instance and tick source.

use crate::logging::LogStream;

/// Diagnostic log ring shared by every task.
///
/// Multiple producers, single consumer (the console task's log drain).
pub static LOG_STREAM: LogStream = LogStream::new();

/// Current RTOS tick for log timestamps.
#[cfg(target_os = "espidf")]
#[inline]
pub fn now_ticks() -> u32 {
    // SAFETY: xTaskGetTickCount is callable from any task context
    unsafe { esp_idf_svc::sys::xTaskGetTickCount() }
}

/// Host builds have no scheduler tick.
#[cfg(not(target_os = "espidf"))]
#[inline]
pub fn now_ticks() -> u32 {
    0
}
