//! Solid-state-relay bank with slow-PWM duty quantisation.
//!
//! Zero-cross SSRs cannot be PWM'd at kHz rates, so the heater duty is
//! spread over a 100-tick window at 100 ms per tick: a duty of 42 % means
//! on for the first 42 ticks of every 10-second window. Cycle-skipping at
//! this rate is gentle on the relay and well inside the thermal mass of
//! any enclosure.
//!
//! The on/off decision is pure state so it is tested on the host; only
//! [`SsrBank::apply`] touches GPIO.

use log::{debug, warn};

use crate::error::ActuatorError;

/// Ticks per quantisation window. With a 100 ms tick this is a 10 s PWM
/// period, so duty resolution is exactly 1 %.
pub const TICKS_PER_CYCLE: u32 = 100;

/// Channels in the bank: heater and one auxiliary (heat mat / CHE).
pub const SSR_CHANNELS: usize = 2;

#[derive(Debug, Clone, Copy)]
struct Channel {
    gpio: i32,
    name: &'static str,
    duty: u8,
    enabled: bool,
}

/// A bank of slow-PWM SSR outputs sharing one tick counter.
pub struct SsrBank {
    channels: [Channel; SSR_CHANNELS],
}

impl SsrBank {
    /// Configures the bank and drives every output low.
    pub fn new(heater_gpio: i32, aux_gpio: i32) -> Result<Self, ActuatorError> {
        let channels = [
            Channel {
                gpio: heater_gpio,
                name: "heater",
                duty: 0,
                enabled: true,
            },
            Channel {
                gpio: aux_gpio,
                name: "aux",
                duty: 0,
                enabled: true,
            },
        ];
        let mut bank = Self { channels };
        for idx in 0..SSR_CHANNELS {
            bank.init_gpio(idx)?;
        }
        Ok(bank)
    }

    /// Sets a channel's duty in percent. Values above 100 are clamped.
    pub fn set_duty(&mut self, channel: usize, duty: u8) -> Result<(), ActuatorError> {
        let ch = self
            .channels
            .get_mut(channel)
            .ok_or(ActuatorError::InvalidChannel)?;
        ch.duty = duty.min(100);
        debug!("ssr {} duty -> {}%", ch.name, ch.duty);
        Ok(())
    }

    pub fn duty(&self, channel: usize) -> Result<u8, ActuatorError> {
        self.channels
            .get(channel)
            .map(|ch| ch.duty)
            .ok_or(ActuatorError::InvalidChannel)
    }

    /// Re-enables a channel after a force-off.
    pub fn enable(&mut self, channel: usize) -> Result<(), ActuatorError> {
        let ch = self
            .channels
            .get_mut(channel)
            .ok_or(ActuatorError::InvalidChannel)?;
        ch.enabled = true;
        Ok(())
    }

    /// Latches every channel off: duty zeroed, output low, and the channel
    /// stays dark until explicitly re-enabled. This is the fault path.
    pub fn force_off_all(&mut self) {
        for idx in 0..SSR_CHANNELS {
            self.channels[idx].duty = 0;
            self.channels[idx].enabled = false;
            if let Err(e) = self.write_gpio(idx, false) {
                warn!("ssr {} force-off gpio write failed: {e}", self.channels[idx].name);
            }
        }
    }

    /// Advances the quantiser. `tick` is the loop's 100 ms counter; the
    /// caller passes it modulo nothing, the window position is derived
    /// here. Returns the levels driven, which tests assert on.
    pub fn tick(&mut self, tick: u32) -> [bool; SSR_CHANNELS] {
        let phase = tick % TICKS_PER_CYCLE;
        let mut levels = [false; SSR_CHANNELS];
        for idx in 0..SSR_CHANNELS {
            let ch = self.channels[idx];
            let on = ch.enabled && phase < u32::from(ch.duty);
            levels[idx] = on;
            if let Err(e) = self.write_gpio(idx, on) {
                warn!("ssr {} gpio write failed: {e}", ch.name);
            }
        }
        levels
    }

    #[cfg(feature = "espidf")]
    fn init_gpio(&mut self, idx: usize) -> Result<(), ActuatorError> {
        use esp_idf_sys as sys;
        let gpio = self.channels[idx].gpio;
        // SAFETY: plain register configuration of a pin this driver owns.
        unsafe {
            if sys::gpio_set_direction(gpio, sys::gpio_mode_t_GPIO_MODE_OUTPUT) != sys::ESP_OK {
                return Err(ActuatorError::GpioWriteFailed);
            }
            if sys::gpio_set_level(gpio, 0) != sys::ESP_OK {
                return Err(ActuatorError::GpioWriteFailed);
            }
        }
        Ok(())
    }

    #[cfg(not(feature = "espidf"))]
    fn init_gpio(&mut self, _idx: usize) -> Result<(), ActuatorError> {
        Ok(())
    }

    #[cfg(feature = "espidf")]
    fn write_gpio(&mut self, idx: usize, on: bool) -> Result<(), ActuatorError> {
        use esp_idf_sys as sys;
        // SAFETY: level write to an output pin configured in init_gpio.
        let rc = unsafe { sys::gpio_set_level(self.channels[idx].gpio, u32::from(on)) };
        if rc != sys::ESP_OK {
            return Err(ActuatorError::GpioWriteFailed);
        }
        Ok(())
    }

    #[cfg(not(feature = "espidf"))]
    fn write_gpio(&mut self, _idx: usize, _on: bool) -> Result<(), ActuatorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> SsrBank {
        SsrBank::new(4, 5).unwrap()
    }

    #[test]
    fn duty_zero_never_fires() {
        let mut b = bank();
        for t in 0..TICKS_PER_CYCLE * 2 {
            assert_eq!(b.tick(t), [false, false]);
        }
    }

    #[test]
    fn duty_100_is_always_on() {
        let mut b = bank();
        b.set_duty(0, 100).unwrap();
        for t in 0..TICKS_PER_CYCLE * 2 {
            assert!(b.tick(t)[0]);
        }
    }

    #[test]
    fn on_ticks_match_the_duty_exactly() {
        let mut b = bank();
        b.set_duty(0, 42).unwrap();
        let on_count = (0..TICKS_PER_CYCLE).filter(|&t| b.tick(t)[0]).count();
        assert_eq!(on_count, 42);
    }

    #[test]
    fn on_time_is_front_loaded_in_the_window() {
        let mut b = bank();
        b.set_duty(0, 30).unwrap();
        assert!(b.tick(0)[0]);
        assert!(b.tick(29)[0]);
        assert!(!b.tick(30)[0]);
        assert!(!b.tick(99)[0]);
        // The next window starts over.
        assert!(b.tick(100)[0]);
    }

    #[test]
    fn duty_above_100_is_clamped() {
        let mut b = bank();
        b.set_duty(0, 250).unwrap();
        assert_eq!(b.duty(0).unwrap(), 100);
    }

    #[test]
    fn channels_are_independent() {
        let mut b = bank();
        b.set_duty(0, 50).unwrap();
        b.set_duty(1, 10).unwrap();
        assert_eq!(b.tick(5), [true, true]);
        assert_eq!(b.tick(20), [true, false]);
        assert_eq!(b.tick(70), [false, false]);
    }

    #[test]
    fn force_off_latches_until_re_enabled() {
        let mut b = bank();
        b.set_duty(0, 80).unwrap();
        b.force_off_all();
        assert_eq!(b.duty(0).unwrap(), 0);
        assert_eq!(b.tick(0), [false, false]);

        // Setting a duty alone is not enough after a force-off.
        b.set_duty(0, 80).unwrap();
        assert_eq!(b.tick(1), [false, false]);

        b.enable(0).unwrap();
        assert!(b.tick(2)[0]);
    }

    #[test]
    fn invalid_channel_is_rejected() {
        let mut b = bank();
        assert_eq!(
            b.set_duty(SSR_CHANNELS, 10),
            Err(ActuatorError::InvalidChannel)
        );
    }
}
