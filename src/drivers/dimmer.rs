//! LEDC-backed light dimmer.
//!
//! Brightness is expressed in per-mille (0..=1000) at the API boundary and
//! mapped onto the 10-bit LEDC duty range. Hardware fades use the LEDC
//! fade engine so the ramp costs no CPU; the host build applies the target
//! value immediately.

use log::debug;

use crate::error::ActuatorError;

/// LEDC timer resolution: 10 bits.
const DUTY_MAX: u32 = 1023;

/// Full-scale brightness at the API boundary.
pub const BRIGHTNESS_MAX: u16 = 1000;

/// Maps API brightness to an LEDC duty value.
fn brightness_to_duty(brightness: u16) -> u32 {
    u32::from(brightness.min(BRIGHTNESS_MAX)) * DUTY_MAX / u32::from(BRIGHTNESS_MAX)
}

pub struct Dimmer {
    brightness: u16,
    initialised: bool,
    #[cfg(feature = "espidf")]
    channel: esp_idf_sys::ledc_channel_t,
}

impl Dimmer {
    /// Binds the dimmer to a GPIO and starts at brightness zero.
    #[cfg(feature = "espidf")]
    pub fn new(gpio: i32, channel: esp_idf_sys::ledc_channel_t) -> Result<Self, ActuatorError> {
        use esp_idf_sys as sys;

        let timer_config = sys::ledc_timer_config_t {
            speed_mode: sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
            duty_resolution: sys::ledc_timer_bit_t_LEDC_TIMER_10_BIT,
            timer_num: sys::ledc_timer_t_LEDC_TIMER_0,
            freq_hz: 5_000,
            clk_cfg: sys::ledc_clk_cfg_t_LEDC_AUTO_CLK,
            ..Default::default()
        };
        // SAFETY: one-time peripheral configuration with valid structs.
        unsafe {
            if sys::ledc_timer_config(&timer_config) != sys::ESP_OK {
                return Err(ActuatorError::PwmWriteFailed);
            }
            let channel_config = sys::ledc_channel_config_t {
                gpio_num: gpio,
                speed_mode: sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel,
                timer_sel: sys::ledc_timer_t_LEDC_TIMER_0,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            };
            if sys::ledc_channel_config(&channel_config) != sys::ESP_OK {
                return Err(ActuatorError::PwmWriteFailed);
            }
            if sys::ledc_fade_func_install(0) != sys::ESP_OK {
                return Err(ActuatorError::PwmWriteFailed);
            }
        }
        Ok(Self {
            brightness: 0,
            initialised: true,
            channel,
        })
    }

    #[cfg(not(feature = "espidf"))]
    pub fn new(_gpio: i32) -> Result<Self, ActuatorError> {
        Ok(Self {
            brightness: 0,
            initialised: true,
        })
    }

    /// Current brightness in per-mille.
    pub fn brightness(&self) -> u16 {
        self.brightness
    }

    /// Sets brightness immediately. Values above full scale are clamped.
    pub fn set(&mut self, brightness: u16) -> Result<(), ActuatorError> {
        if !self.initialised {
            return Err(ActuatorError::NotInitialised);
        }
        self.brightness = brightness.min(BRIGHTNESS_MAX);
        debug!("dimmer -> {} permille", self.brightness);
        self.write_duty(brightness_to_duty(self.brightness))
    }

    /// Ramps to a target brightness over `fade_ms` milliseconds using the
    /// hardware fade engine. A zero duration snaps.
    pub fn fade_to(&mut self, brightness: u16, fade_ms: u32) -> Result<(), ActuatorError> {
        if !self.initialised {
            return Err(ActuatorError::NotInitialised);
        }
        if fade_ms == 0 {
            return self.set(brightness);
        }
        self.brightness = brightness.min(BRIGHTNESS_MAX);
        self.start_fade(brightness_to_duty(self.brightness), fade_ms)
    }

    #[cfg(feature = "espidf")]
    fn write_duty(&mut self, duty: u32) -> Result<(), ActuatorError> {
        use esp_idf_sys as sys;
        // SAFETY: channel was configured in new().
        unsafe {
            if sys::ledc_set_duty(sys::ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel, duty)
                != sys::ESP_OK
                || sys::ledc_update_duty(sys::ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel)
                    != sys::ESP_OK
            {
                return Err(ActuatorError::PwmWriteFailed);
            }
        }
        Ok(())
    }

    #[cfg(not(feature = "espidf"))]
    fn write_duty(&mut self, _duty: u32) -> Result<(), ActuatorError> {
        Ok(())
    }

    #[cfg(feature = "espidf")]
    fn start_fade(&mut self, duty: u32, fade_ms: u32) -> Result<(), ActuatorError> {
        use esp_idf_sys as sys;
        // SAFETY: fade functions were installed in new().
        unsafe {
            if sys::ledc_set_fade_with_time(
                sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
                self.channel,
                duty,
                fade_ms as i32,
            ) != sys::ESP_OK
                || sys::ledc_fade_start(
                    sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
                    self.channel,
                    sys::ledc_fade_mode_t_LEDC_FADE_NO_WAIT,
                ) != sys::ESP_OK
            {
                return Err(ActuatorError::PwmWriteFailed);
            }
        }
        Ok(())
    }

    #[cfg(not(feature = "espidf"))]
    fn start_fade(&mut self, duty: u32, _fade_ms: u32) -> Result<(), ActuatorError> {
        self.write_duty(duty)
    }
}
