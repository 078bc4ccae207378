//! Module: config
//!
//! Purpose: Compile-time configuration for the bring-up harness.
//!
//! Architecture:
//! - `CONFIG`: single `const` source of truth for task layout, timing,
//!   console behaviour and motor calibration
//! - Cargo features select which RTOS fault hooks are live
//!   (see [`FaultHooksConfig`])
//! - Board pin numbers live next to the HAL in `hal::board`
//!
//! Safety: Read-only. Nothing here changes after link time.

use crate::logging::LogLevel;
use crate::motor::Calibration;
use crate::task::TaskSpec;

/// Which fault hooks report, resolved from Cargo features.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultHooksConfig {
    /// Failed `fault_assert!` checks are reported and halt.
    pub assert_report: bool,
    /// RTOS stack overflow detection latches the fault LED and halts.
    pub stack_overflow: bool,
}

impl FaultHooksConfig {
    /// Selection made by the `assert-hook` / `stack-overflow-hook` features.
    pub const fn from_features() -> Self {
        Self {
            assert_report: cfg!(feature = "assert-hook"),
            stack_overflow: cfg!(feature = "stack-overflow-hook"),
        }
    }

    /// Every hook enabled.
    pub const fn all() -> Self {
        Self { assert_report: true, stack_overflow: true }
    }

    /// Every hook compiled out.
    pub const fn none() -> Self {
        Self { assert_report: false, stack_overflow: false }
    }
}

/// UART wiring and speed.
#[derive(Clone, Copy, Debug)]
pub struct UartSpec {
    pub baud_rate: u32,
    pub tx_pin: i32,
    /// `None` for TX-only ports.
    pub rx_pin: Option<i32>,
}

/// Whole-harness configuration.
#[derive(Clone, Copy, Debug)]
pub struct BringupConfig {
    /// LED blink task.
    pub heartbeat_task: TaskSpec,
    /// Interactive test menu task.
    pub console_task: TaskSpec,
    /// Time between heartbeat toggles.
    pub heartbeat_period_ms: u32,
    /// Echo typed characters back to the terminal.
    pub console_echo: bool,
    /// Max log entries moved to the log UART per console cycle.
    pub log_drain_budget: usize,
    /// Most verbose level pushed to the log ring, applied at boot.
    pub log_level: LogLevel,
    /// ADC scaling and encoder resolution.
    pub calibration: Calibration,
    /// Interactive console (UART0, shared with ROM output).
    pub console_uart: UartSpec,
    /// TX-only diagnostic log output.
    pub log_uart: UartSpec,
    pub hooks: FaultHooksConfig,
}

/// Heartbeat period in milliseconds.
pub const HEARTBEAT_PERIOD_MS: u32 = 500;

/// Default configuration for the ESP32-S3 motor board.
pub const CONFIG: BringupConfig = BringupConfig {
    heartbeat_task: TaskSpec {
        name: "LED",
        priority: 2,
        stack_bytes: 2048,
        core: Some(0),
    },
    console_task: TaskSpec {
        name: "TEST",
        priority: 1,
        stack_bytes: 6144,
        core: Some(0),
    },
    heartbeat_period_ms: HEARTBEAT_PERIOD_MS,
    console_echo: true,
    log_drain_budget: 16,
    log_level: if cfg!(debug_assertions) { LogLevel::Debug } else { LogLevel::Info },
    calibration: Calibration {
        adc_ref_mv: 3300,
        adc_max: 4095,
        encoder_cpr: 1320,
    },
    console_uart: UartSpec { baud_rate: 115_200, tx_pin: 43, rx_pin: Some(44) },
    log_uart: UartSpec { baud_rate: 115_200, tx_pin: 6, rx_pin: None },
    hooks: FaultHooksConfig::from_features(),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_priorities_distinct_and_above_idle() {
        assert_ne!(CONFIG.heartbeat_task.priority, CONFIG.console_task.priority);
        assert!(CONFIG.heartbeat_task.priority > 0);
        assert!(CONFIG.console_task.priority > 0);
    }

    #[test]
    fn test_log_level_filters_stream() {
        let stream = crate::logging::LogStream::<4>::new();
        stream.set_max_level(CONFIG.log_level);

        assert_eq!(stream.max_level(), CONFIG.log_level);
        assert!(stream.enabled(LogLevel::Info));
        assert!(!stream.enabled(LogLevel::Trace));
    }

    #[test]
    fn test_hooks_follow_features() {
        let hooks = FaultHooksConfig::from_features();
        assert_eq!(hooks.assert_report, cfg!(feature = "assert-hook"));
        assert_eq!(hooks.stack_overflow, cfg!(feature = "stack-overflow-hook"));
    }

    #[test]
    fn test_heartbeat_period() {
        assert_eq!(CONFIG.heartbeat_period_ms, 500);
    }
}
