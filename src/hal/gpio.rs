//! GPIO HAL for the heartbeat and fault LEDs.

use esp_idf_svc::sys;

use crate::fault::FaultIndicator;
use crate::heartbeat::StatusLed;

use super::board;

/// LED driven by the heartbeat task.
pub struct GpioLed {
    pin: i32,
    on: bool,
}

impl GpioLed {
    pub fn new(pin: i32) -> Result<Self, sys::EspError> {
        board::output_low(pin)?;
        Ok(Self { pin, on: false })
    }
}

impl StatusLed for GpioLed {
    fn toggle(&mut self) {
        self.on = !self.on;
        unsafe {
            sys::gpio_set_level(self.pin, self.on as u32);
        }
    }
}

/// Fault LED. Configured at boot, only ever driven high afterwards.
///
/// Holds no state so it can sit in a static and be latched from the
/// stack overflow hook.
pub struct FaultLed {
    pin: i32,
}

impl FaultLed {
    pub const fn new(pin: i32) -> Self {
        Self { pin }
    }

    pub fn init(&self) -> Result<(), sys::EspError> {
        board::output_low(self.pin)
    }
}

impl FaultIndicator for FaultLed {
    fn latch(&self) {
        // Single register write through the driver, no locks taken.
        unsafe {
            sys::gpio_set_level(self.pin, 1);
        }
    }
}
