//! dcmotor-bringup - firmware entry point
//!
//! 1. Configure the fault LED and both UARTs
//! 2. Create the heartbeat and console tasks, pinned to core 0
//! 3. Hand the CPU to the scheduler
//!
//! Everything shared between tasks and the fault hooks is a static here.
//! Nothing is allocated after boot.

#![cfg_attr(target_os = "espidf", no_std)]
#![cfg_attr(target_os = "espidf", no_main)]

#[cfg(target_os = "espidf")]
mod firmware {
    use core::cell::UnsafeCell;

    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::sys as esp_idf_sys;

    use dcmotor_bringup::bootstrap::{self, TaskPlan};
    use dcmotor_bringup::console::{ConsoleChannel, ConsoleTask, LineReader, Terminal};
    use dcmotor_bringup::fault::{fatal_halt, FaultHooks, FaultSentinel, FaultState, Halt};
    use dcmotor_bringup::hal::board;
    use dcmotor_bringup::hal::{
        ConsoleUartRx, ConsoleUartTx, CriticalHalt, EspHeap, EspRtos, FaultLed, GpioLed, MotorBoard,
        PreemptionGuard, RomConsole, RtosDelay,
    };
    use dcmotor_bringup::heartbeat::Heartbeat;
    use dcmotor_bringup::task::TaskStatus;
    use dcmotor_bringup::uart_logger::{init_uart_logger, LogDrain, UartLogSink};
    use dcmotor_bringup::{fault_assert, log_error, log_info, CONFIG, LOG_STREAM};

    /// Hand-over slot for a value built in `main` and consumed by one task.
    struct BootCell<T>(UnsafeCell<Option<T>>);

    // SAFETY: `put` only runs in `main` before the owning task is created,
    // `take` only runs in that task.
    unsafe impl<T: Send> Sync for BootCell<T> {}

    impl<T> BootCell<T> {
        const fn new() -> Self {
            Self(UnsafeCell::new(None))
        }

        fn put(&self, value: T) {
            unsafe { *self.0.get() = Some(value) }
        }

        fn take(&self) -> Option<T> {
            unsafe { (*self.0.get()).take() }
        }
    }

    type Channel = ConsoleChannel<ConsoleUartTx, RomConsole, PreemptionGuard>;

    static CHANNEL: Channel =
        ConsoleChannel::new(ConsoleUartTx::new(board::CONSOLE_UART), RomConsole, PreemptionGuard::new());
    static FAULT_STATE: FaultState = FaultState::new();
    static FAULT_LED: FaultLed = FaultLed::new(board::FAULT_LED);
    static HALT: CriticalHalt = CriticalHalt;
    static SENTINEL: FaultSentinel<'static, ConsoleUartTx, RomConsole, PreemptionGuard> =
        FaultSentinel::new(&CHANNEL, &FAULT_STATE, &FAULT_LED, &HALT, CONFIG.hooks);

    static HEARTBEAT_STATUS: TaskStatus = TaskStatus::new();
    static CONSOLE_STATUS: TaskStatus = TaskStatus::new();

    static CONSOLE_RX: BootCell<ConsoleUartRx> = BootCell::new();
    static LOG_UART: BootCell<UartLogSink<'static>> = BootCell::new();

    #[no_mangle]
    fn main() {
        esp_idf_sys::link_patches();
        LOG_STREAM.set_max_level(CONFIG.log_level);

        if FAULT_LED.init().is_err() {
            fatal_halt();
        }

        let Ok(peripherals) = Peripherals::take() else {
            fatal_halt()
        };

        match ConsoleUartRx::install(
            peripherals.uart0,
            peripherals.pins.gpio43,
            peripherals.pins.gpio44,
            &CONFIG.console_uart,
        ) {
            Ok(rx) => CONSOLE_RX.put(rx),
            Err(_) => fatal_halt(),
        }

        // The log UART is optional, the harness runs without it.
        match init_uart_logger(peripherals.uart1, peripherals.pins.gpio6, &CONFIG.log_uart) {
            Ok(tx) => LOG_UART.put(UartLogSink::new(tx)),
            Err(e) => log_error!(LOG_STREAM, "boot", "log uart: {}", e),
        }

        let tasks = [
            TaskPlan {
                spec: CONFIG.heartbeat_task,
                entry: heartbeat_task,
                status: &HEARTBEAT_STATUS,
            },
            TaskPlan {
                spec: CONFIG.console_task,
                entry: console_task,
                status: &CONSOLE_STATUS,
            },
        ];

        let mut rtos = EspRtos::new();
        let mut out = CHANNEL.writer();
        bootstrap::run(&mut rtos, &mut out, &tasks, &FAULT_STATE)
    }

    fn heartbeat_task() -> ! {
        let led = GpioLed::new(board::HEARTBEAT_LED);
        fault_assert!(SENTINEL, led.is_ok());
        let Ok(led) = led else { HALT.halt() };

        Heartbeat::new(led, CONFIG.heartbeat_period_ms, &FAULT_STATE, &HEARTBEAT_STATUS).run(RtosDelay, &HALT)
    }

    fn console_task() -> ! {
        let rx = CONSOLE_RX.take();
        fault_assert!(SENTINEL, rx.is_some());
        let Some(rx) = rx else { HALT.halt() };

        let mut log_sink = LOG_UART.take();
        let terminal = Terminal::new(LineReader::new(rx, CONFIG.console_echo), CHANNEL.writer());
        let motor = MotorBoard::new(board::MOTOR_PINS, CONFIG.calibration);

        let mut console = ConsoleTask::new(terminal, motor, &EspHeap, &FAULT_STATE, &CONSOLE_STATUS);
        if let Some(sink) = log_sink.as_mut() {
            console = console.with_log_drain(LogDrain::new(&LOG_STREAM, sink, CONFIG.log_drain_budget));
        }
        log_info!(LOG_STREAM, "console", "menu up");

        console.run(&HALT)
    }

    /// Replaces ESP-IDF's weak default, which prints and aborts.
    ///
    /// The name pointer comes from the overflowed task's TCB and is not
    /// trusted.
    #[cfg(feature = "stack-overflow-hook")]
    #[no_mangle]
    pub extern "C" fn vApplicationStackOverflowHook(_task: esp_idf_sys::TaskHandle_t, _name: *mut core::ffi::c_char) {
        SENTINEL.stack_overflow("?");
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {}
