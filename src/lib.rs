//! # dcmotor-bringup
//!
//! Bring-up and diagnostic harness for a DC motor control board.
//!
//! ## Architecture
//!
//! Two FreeRTOS tasks share the board:
//! - **Heartbeat**: toggles an LED every 500 ms, touches nothing else
//! - **Console**: numeric test menu driving the [`MotorSubsystem`]
//!
//! The console UART is a [`ConsoleChannel`] shared between the console
//! task and the [`FaultSentinel`]. Every fatal condition ends in a
//! function returning `!`.
//!
//! Everything outside `hal` is platform independent and tested on the host.

#![cfg_attr(not(test), no_std)]

pub mod bootstrap;
pub mod config;
pub mod console;
pub mod fault;
pub mod heartbeat;
pub mod log_globals;
pub mod logging;
pub mod motor;
pub mod task;
pub mod uart_logger;

#[cfg(target_os = "espidf")]
pub mod hal;

pub use config::CONFIG;
pub use console::{ConsoleChannel, ConsoleTask};
pub use fault::{fatal_halt, FaultCode, FaultSentinel, FaultState};
pub use heartbeat::Heartbeat;
pub use log_globals::LOG_STREAM;
pub use motor::MotorSubsystem;
