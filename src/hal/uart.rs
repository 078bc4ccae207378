//! Console UART.
//!
//! The interactive console is split three ways:
//!
//! - [`ConsoleUartRx`] owns the UART driver and is moved into the console
//!   task, the only reader.
//! - [`ConsoleUartTx`] writes through the driver's TX ring by port number.
//!   It is what the shared [`ConsoleChannel`](crate::ConsoleChannel) holds.
//! - [`RomConsole`] writes with the ROM's polled routine. It is used only for
//!   fault reports, inside a critical section where the driver must not be
//!   entered.

use core::ffi::{c_char, c_int, c_void};

use esp_idf_svc::hal::delay::BLOCK;
use esp_idf_svc::hal::gpio;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys;

use crate::config::UartSpec;
use crate::console::channel::{ConsolePort, FaultPort};
use crate::console::{ByteSource, ConsoleError};

/// Receive side of the console. Blocks the calling task until a byte
/// arrives.
pub struct ConsoleUartRx {
    driver: UartDriver<'static>,
}

impl ConsoleUartRx {
    pub fn install(
        uart: impl Peripheral<P = uart::UART0> + 'static,
        tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'static,
        rx_pin: impl Peripheral<P = impl gpio::InputPin> + 'static,
        spec: &UartSpec,
    ) -> Result<Self, sys::EspError> {
        let config = uart::config::Config::default().baudrate(Hertz(spec.baud_rate));
        let driver = UartDriver::new(
            uart,
            tx_pin,
            rx_pin,
            Option::<gpio::AnyIOPin>::None, // CTS
            Option::<gpio::AnyIOPin>::None, // RTS
            &config,
        )?;
        Ok(Self { driver })
    }
}

impl ByteSource for ConsoleUartRx {
    fn read_byte(&mut self) -> Result<u8, ConsoleError> {
        let mut byte = [0u8; 1];
        loop {
            match self.driver.read(&mut byte, BLOCK) {
                Ok(1) => return Ok(byte[0]),
                Ok(_) => continue,
                Err(_) => return Err(ConsoleError::Io),
            }
        }
    }
}

/// Transmit side of the console.
pub struct ConsoleUartTx {
    port: sys::uart_port_t,
}

impl ConsoleUartTx {
    pub const fn new(port: sys::uart_port_t) -> Self {
        Self { port }
    }
}

impl ConsolePort for ConsoleUartTx {
    fn write_all(&mut self, bytes: &[u8]) {
        let mut rest = bytes;
        while !rest.is_empty() {
            let n = unsafe { sys::uart_write_bytes(self.port, rest.as_ptr() as *const c_void, rest.len()) };
            if n <= 0 {
                // Driver not installed or port invalid.
                return;
            }
            rest = &rest[(n as usize).min(rest.len())..];
        }
    }

    fn flush(&mut self) {
        unsafe {
            sys::uart_wait_tx_done(self.port, BLOCK);
        }
    }
}

/// Polled ROM output, safe with interrupts masked.
pub struct RomConsole;

impl FaultPort for RomConsole {
    fn write_polled(&self, bytes: &[u8]) {
        const FMT: &[u8] = b"%c\0";
        for &b in bytes {
            unsafe {
                sys::esp_rom_printf(FMT.as_ptr() as *const c_char, b as c_int);
            }
        }
    }
}
