//! Pin map of the bring-up board.
//!
//! ```text
//! ESP32-S3         Peripheral
//! GPIO43 (TX) ───▶ USB-UART (console, UART0)
//! GPIO44 (RX) ◀─── USB-UART
//! GPIO6  (TX) ───▶ USB-UART (diagnostic log, UART1)
//! GPIO2       ───▶ heartbeat LED
//! GPIO21      ───▶ fault LED
//! GPIO4       ───▶ driver PWM
//! GPIO5       ───▶ driver DIR
//! GPIO7       ───▶ driver BRAKE
//! GPIO15      ◀─── encoder A
//! GPIO16      ◀─── encoder B
//! GPIO1       ◀─── current sense (ADC1 channel 0)
//! ```

use esp_idf_svc::sys;

pub const HEARTBEAT_LED: i32 = 2;
pub const FAULT_LED: i32 = 21;

/// Console UART. The channel's TX side writes to it by port number.
pub const CONSOLE_UART: sys::uart_port_t = 0;

/// Motor driver and sensor pins.
#[derive(Clone, Copy, Debug)]
pub struct MotorPins {
    pub pwm: i32,
    pub dir: i32,
    pub brake: i32,
    pub encoder_a: i32,
    pub encoder_b: i32,
    pub adc_channel: sys::adc_channel_t,
}

pub const MOTOR_PINS: MotorPins = MotorPins {
    pwm: 4,
    dir: 5,
    brake: 7,
    encoder_a: 15,
    encoder_b: 16,
    adc_channel: sys::adc_channel_t_ADC_CHANNEL_0,
};

/// Configure `pin` as a push-pull output driven low.
pub fn output_low(pin: i32) -> Result<(), sys::EspError> {
    unsafe {
        sys::esp!(sys::gpio_reset_pin(pin))?;
        sys::esp!(sys::gpio_set_direction(pin, sys::gpio_mode_t_GPIO_MODE_OUTPUT))?;
        sys::esp!(sys::gpio_set_level(pin, 0))?;
    }
    Ok(())
}
