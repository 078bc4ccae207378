//! Motor subsystem capability interface.
//!
//! The ADC, PWM bridge and shaft encoder belong to the board and are
//! driven elsewhere (`hal::motor_board` on the device). The console only
//! sees this trait. Derived units are computed here so every backend
//! reports them the same way.

/// Scaling constants for the derived readings.
///
/// The all-zero default yields zero for every derived value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Calibration {
    /// ADC reference voltage in millivolts.
    pub adc_ref_mv: u32,
    /// ADC full-scale code (4095 for 12 bit).
    pub adc_max: u32,
    /// Encoder counts per gearbox shaft revolution.
    pub encoder_cpr: u32,
}

impl Calibration {
    /// `raw * ref / max`, truncated.
    pub fn millivolts(&self, raw: u16) -> u32 {
        if self.adc_max == 0 {
            return 0;
        }
        (u32::from(raw) * self.adc_ref_mv) / self.adc_max
    }

    /// `ticks * 360 / cpr`, truncated, never rounded.
    ///
    /// Computed in 64 bits so large tick counts do not wrap.
    pub fn degrees(&self, ticks: u32) -> u32 {
        if self.encoder_cpr == 0 {
            return 0;
        }
        let deg = (u64::from(ticks) * 360) / u64::from(self.encoder_cpr);
        u32::try_from(deg).unwrap_or(u32::MAX)
    }
}

/// One ADC sample with its derived voltage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdcReading {
    pub raw: u16,
    pub millivolts: u32,
}

/// Gearbox shaft position with its derived angle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderReading {
    pub ticks: u32,
    pub degrees: u32,
}

/// Narrow interface to the motor board.
///
/// All operations are synchronous and do not block on success.
pub trait MotorSubsystem {
    /// Bring up ADC, bridge driver and encoder.
    fn init(&mut self);

    /// Raw ADC code.
    fn adc_raw(&mut self) -> u16;

    /// Forward a duty value to the PWM driver.
    ///
    /// Nominal range is 0..=65535. Larger values are passed through as
    /// typed; clamping, if any, is the driver's business.
    fn set_pwm_duty(&mut self, duty: u32);

    fn set_direction(&mut self, forward: bool);

    fn brake(&mut self);

    /// Make the current shaft position the zero reference.
    fn zero_encoder(&mut self);

    /// Shaft position in encoder ticks since the last zero.
    fn encoder_ticks(&mut self) -> u32;

    fn calibration(&self) -> Calibration;

    fn read_adc(&mut self) -> AdcReading {
        let raw = self.adc_raw();
        AdcReading { raw, millivolts: self.calibration().millivolts(raw) }
    }

    fn get_encoder_position(&mut self) -> EncoderReading {
        let ticks = self.encoder_ticks();
        EncoderReading { ticks, degrees: self.calibration().degrees(ticks) }
    }
}
