//! Hardware Abstraction Layer for the motor bring-up board.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Business logic stays in core modules, HAL is just I/O.

pub mod board;
pub mod gpio;
pub mod motor_board;
pub mod rtos;
pub mod uart;

pub use gpio::{FaultLed, GpioLed};
pub use motor_board::MotorBoard;
pub use rtos::{CriticalHalt, EspHeap, EspRtos, PreemptionGuard, RtosDelay};
pub use uart::{ConsoleUartRx, ConsoleUartTx, RomConsole};
