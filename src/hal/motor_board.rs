//! Motor driver, current sense ADC and quadrature encoder.
//!
//! Hardware is configured by [`MotorSubsystem::init`] (menu entry 1), not
//! at construction, so the menu can come up on a board with nothing
//! attached. Until then every operation is a no-op and readings are zero.

use core::ffi::c_int;
use core::ptr;

use esp_idf_svc::sys::{self, esp, EspError};

use crate::log_globals::LOG_STREAM;
use crate::motor::{Calibration, MotorSubsystem};
use crate::{log_error, log_info};

use super::board::{self, MotorPins};

const PWM_MODE: sys::ledc_mode_t = sys::ledc_mode_t_LEDC_LOW_SPEED_MODE;
const PWM_TIMER: sys::ledc_timer_t = sys::ledc_timer_t_LEDC_TIMER_0;
const PWM_CHANNEL: sys::ledc_channel_t = sys::ledc_channel_t_LEDC_CHANNEL_0;
const PWM_FREQ_HZ: u32 = 20_000;

/// 12-bit LEDC resolution, the most 20 kHz allows from the 80 MHz clock.
const PWM_BITS: u32 = 12;
const PWM_MAX: u32 = (1 << PWM_BITS) - 1;

struct Hardware {
    adc: sys::adc_oneshot_unit_handle_t,
    pcnt: sys::pcnt_unit_handle_t,
}

pub struct MotorBoard {
    pins: MotorPins,
    calibration: Calibration,
    hw: Option<Hardware>,
}

impl MotorBoard {
    pub const fn new(pins: MotorPins, calibration: Calibration) -> Self {
        Self { pins, calibration, hw: None }
    }

    /// Scale a 16-bit duty to the LEDC resolution. Saturates at full on.
    fn hw_duty(duty: u32) -> u32 {
        (duty >> (16 - PWM_BITS)).min(PWM_MAX)
    }

    fn init_pwm(&self) -> Result<(), EspError> {
        let timer = sys::ledc_timer_config_t {
            speed_mode: PWM_MODE,
            timer_num: PWM_TIMER,
            freq_hz: PWM_FREQ_HZ,
            duty_resolution: PWM_BITS,
            clk_cfg: sys::soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
            ..Default::default()
        };
        let channel = sys::ledc_channel_config_t {
            gpio_num: self.pins.pwm,
            speed_mode: PWM_MODE,
            channel: PWM_CHANNEL,
            timer_sel: PWM_TIMER,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        };
        unsafe {
            esp!(sys::ledc_timer_config(&timer))?;
            esp!(sys::ledc_channel_config(&channel))?;
        }
        board::output_low(self.pins.dir)?;
        board::output_low(self.pins.brake)
    }

    fn init_adc(&self) -> Result<sys::adc_oneshot_unit_handle_t, EspError> {
        let mut handle: sys::adc_oneshot_unit_handle_t = ptr::null_mut();
        let unit = sys::adc_oneshot_unit_init_cfg_t {
            unit_id: sys::adc_unit_t_ADC_UNIT_1,
            ..Default::default()
        };
        let channel = sys::adc_oneshot_chan_cfg_t {
            atten: sys::adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: sys::adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        unsafe {
            esp!(sys::adc_oneshot_new_unit(&unit, &mut handle))?;
            esp!(sys::adc_oneshot_config_channel(handle, self.pins.adc_channel, &channel))?;
        }
        Ok(handle)
    }

    /// 4x quadrature decode. The counter wraps at one output revolution.
    fn init_encoder(&self) -> Result<sys::pcnt_unit_handle_t, EspError> {
        let limit = self.calibration.encoder_cpr.min(i16::MAX as u32) as c_int;
        let unit_cfg = sys::pcnt_unit_config_t {
            low_limit: -limit,
            high_limit: limit,
            ..Default::default()
        };
        let mut unit: sys::pcnt_unit_handle_t = ptr::null_mut();
        let mut chan_a: sys::pcnt_channel_handle_t = ptr::null_mut();
        let mut chan_b: sys::pcnt_channel_handle_t = ptr::null_mut();
        let a_cfg = sys::pcnt_chan_config_t {
            edge_gpio_num: self.pins.encoder_a,
            level_gpio_num: self.pins.encoder_b,
            ..Default::default()
        };
        let b_cfg = sys::pcnt_chan_config_t {
            edge_gpio_num: self.pins.encoder_b,
            level_gpio_num: self.pins.encoder_a,
            ..Default::default()
        };

        unsafe {
            esp!(sys::pcnt_new_unit(&unit_cfg, &mut unit))?;
            esp!(sys::pcnt_new_channel(unit, &a_cfg, &mut chan_a))?;
            esp!(sys::pcnt_new_channel(unit, &b_cfg, &mut chan_b))?;
            esp!(sys::pcnt_channel_set_edge_action(
                chan_a,
                sys::pcnt_channel_edge_action_t_PCNT_CHANNEL_EDGE_ACTION_DECREASE,
                sys::pcnt_channel_edge_action_t_PCNT_CHANNEL_EDGE_ACTION_INCREASE,
            ))?;
            esp!(sys::pcnt_channel_set_level_action(
                chan_a,
                sys::pcnt_channel_level_action_t_PCNT_CHANNEL_LEVEL_ACTION_KEEP,
                sys::pcnt_channel_level_action_t_PCNT_CHANNEL_LEVEL_ACTION_INVERSE,
            ))?;
            esp!(sys::pcnt_channel_set_edge_action(
                chan_b,
                sys::pcnt_channel_edge_action_t_PCNT_CHANNEL_EDGE_ACTION_INCREASE,
                sys::pcnt_channel_edge_action_t_PCNT_CHANNEL_EDGE_ACTION_DECREASE,
            ))?;
            esp!(sys::pcnt_channel_set_level_action(
                chan_b,
                sys::pcnt_channel_level_action_t_PCNT_CHANNEL_LEVEL_ACTION_KEEP,
                sys::pcnt_channel_level_action_t_PCNT_CHANNEL_LEVEL_ACTION_INVERSE,
            ))?;
            esp!(sys::pcnt_unit_enable(unit))?;
            esp!(sys::pcnt_unit_clear_count(unit))?;
            esp!(sys::pcnt_unit_start(unit))?;
        }
        Ok(unit)
    }

    fn bring_up(&self) -> Result<Hardware, EspError> {
        self.init_pwm()?;
        let adc = self.init_adc()?;
        let pcnt = self.init_encoder()?;
        Ok(Hardware { adc, pcnt })
    }
}

impl MotorSubsystem for MotorBoard {
    fn init(&mut self) {
        if self.hw.is_some() {
            log_info!(LOG_STREAM, "motor", "already initialized");
            return;
        }
        match self.bring_up() {
            Ok(hw) => self.hw = Some(hw),
            Err(e) => log_error!(LOG_STREAM, "motor", "init failed: {}", e),
        }
    }

    fn adc_raw(&mut self) -> u16 {
        let Some(hw) = self.hw.as_ref() else {
            return 0;
        };
        let mut raw: c_int = 0;
        match unsafe { esp!(sys::adc_oneshot_read(hw.adc, self.pins.adc_channel, &mut raw)) } {
            Ok(()) => raw.clamp(0, u16::MAX as c_int) as u16,
            Err(e) => {
                log_error!(LOG_STREAM, "motor", "adc read: {}", e);
                0
            }
        }
    }

    fn set_pwm_duty(&mut self, duty: u32) {
        if self.hw.is_none() {
            return;
        }
        unsafe {
            sys::ledc_set_duty(PWM_MODE, PWM_CHANNEL, Self::hw_duty(duty));
            sys::ledc_update_duty(PWM_MODE, PWM_CHANNEL);
        }
    }

    fn set_direction(&mut self, forward: bool) {
        if self.hw.is_none() {
            return;
        }
        unsafe {
            sys::gpio_set_level(self.pins.brake, 0);
            sys::gpio_set_level(self.pins.dir, forward as u32);
        }
    }

    fn brake(&mut self) {
        if self.hw.is_none() {
            return;
        }
        unsafe {
            sys::ledc_set_duty(PWM_MODE, PWM_CHANNEL, 0);
            sys::ledc_update_duty(PWM_MODE, PWM_CHANNEL);
            sys::gpio_set_level(self.pins.brake, 1);
        }
    }

    fn zero_encoder(&mut self) {
        if let Some(hw) = self.hw.as_ref() {
            unsafe {
                sys::pcnt_unit_clear_count(hw.pcnt);
            }
        }
    }

    fn encoder_ticks(&mut self) -> u32 {
        let Some(hw) = self.hw.as_ref() else {
            return 0;
        };
        let mut count: c_int = 0;
        if let Err(e) = unsafe { esp!(sys::pcnt_unit_get_count(hw.pcnt, &mut count)) } {
            log_error!(LOG_STREAM, "motor", "encoder read: {}", e);
            return 0;
        }
        let cpr = self.calibration.encoder_cpr.max(1) as c_int;
        count.rem_euclid(cpr) as u32
    }

    fn calibration(&self) -> Calibration {
        self.calibration
    }
}
