//! Habitat presets and their validation.
//!
//! A [`Preset`] bundles everything a habitat needs: per-zone temperature
//! bands, a humidity band, the photoperiod, PID gains and safety limits.
//! Presets are serialised with `postcard` and stored as a single NVS blob;
//! a preset that fails [`Preset::validate`] after load is discarded and the
//! species default takes its place, so the firmware always boots with a
//! usable configuration.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum species-name length stored in a preset.
pub const SPECIES_NAME_LEN: usize = 32;

/// Physically plausible temperature range for any target (°C).
const TEMP_TARGET_MIN: f32 = -20.0;
const TEMP_TARGET_MAX: f32 = 80.0;

/// A target value with its acceptable band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub target: f32,
    pub min: f32,
    pub max: f32,
}

impl Band {
    pub const fn new(target: f32, min: f32, max: f32) -> Self {
        Self { target, min, max }
    }

    fn is_valid(&self, lo: f32, hi: f32) -> bool {
        let in_range = |v: f32| v.is_finite() && v >= lo && v <= hi;
        in_range(self.target) && in_range(self.min) && in_range(self.max) && self.min < self.max
    }
}

/// Daily photoperiod with optional sunrise/sunset fades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSchedule {
    /// Hour the lights come on, 0..=23.
    pub on_hour: u8,
    /// Hour the lights go off, 0..=23.
    pub off_hour: u8,
    /// Sunrise fade duration in minutes. 0 disables the fade.
    pub sunrise_minutes: u16,
    /// Sunset fade duration in minutes. 0 disables the fade.
    pub sunset_minutes: u16,
}

/// PID gains for the heater loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl PidGains {
    fn is_valid(&self) -> bool {
        let ok = |g: f32| g.is_finite() && g >= 0.0;
        ok(self.kp) && ok(self.ki) && ok(self.kd)
    }
}

/// Safety-monitor limits carried with the preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// Degrees above the hot-zone setpoint that trips the overtemp fault.
    pub overtemp_offset: f32,
    /// Continuous heater-on limit in seconds. 0 disables the check.
    pub heater_max_on_secs: u32,
}

/// A complete habitat configuration for one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub species: String<SPECIES_NAME_LEN>,
    pub temp_hot: Band,
    pub temp_cool: Band,
    pub humidity: Band,
    pub light: LightSchedule,
    pub pid: PidGains,
    pub safety: SafetyLimits,
}

impl Default for Preset {
    /// Ball python: 32 °C basking / 26 °C cool side, 60 % RH, 12-hour
    /// photoperiod with 30-minute fades.
    fn default() -> Self {
        let mut species = String::new();
        // "Ball Python" always fits in the fixed-capacity string.
        let _ = species.push_str("Ball Python");
        Self {
            species,
            temp_hot: Band::new(32.0, 30.0, 34.0),
            temp_cool: Band::new(26.0, 24.0, 28.0),
            humidity: Band::new(60.0, 50.0, 70.0),
            light: LightSchedule {
                on_hour: 7,
                off_hour: 19,
                sunrise_minutes: 30,
                sunset_minutes: 30,
            },
            pid: PidGains {
                kp: 2.0,
                ki: 0.5,
                kd: 1.0,
            },
            safety: SafetyLimits {
                overtemp_offset: 5.0,
                heater_max_on_secs: 3600,
            },
        }
    }
}

impl Preset {
    /// Checks that every field is usable before the preset is allowed to
    /// drive hardware. Called after NVS load and before every save.
    pub fn validate(&self) -> Result<()> {
        if self.species.is_empty() {
            return Err(Error::Config("empty species name"));
        }
        if !self.temp_hot.is_valid(TEMP_TARGET_MIN, TEMP_TARGET_MAX) {
            return Err(Error::Config("hot-zone band out of range"));
        }
        if !self.temp_cool.is_valid(TEMP_TARGET_MIN, TEMP_TARGET_MAX) {
            return Err(Error::Config("cool-zone band out of range"));
        }
        if !self.humidity.is_valid(0.0, 100.0) {
            return Err(Error::Config("humidity band out of range"));
        }
        if self.light.on_hour > 23 || self.light.off_hour > 23 {
            return Err(Error::Config("light hours out of range"));
        }
        if !self.pid.is_valid() {
            return Err(Error::Config("negative or non-finite PID gain"));
        }
        if !(self.safety.overtemp_offset.is_finite() && self.safety.overtemp_offset > 0.0) {
            return Err(Error::Config("overtemp offset must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preset_is_valid() {
        let p = Preset::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.species.as_str(), "Ball Python");
        assert_eq!(p.temp_hot.target, 32.0);
        assert_eq!(p.light.on_hour, 7);
        assert_eq!(p.light.off_hour, 19);
    }

    #[test]
    fn postcard_roundtrip_preserves_the_preset() {
        let p = Preset::default();
        let bytes: std::vec::Vec<u8> = postcard::to_allocvec(&p).unwrap();
        let back: Preset = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(back, p);
    }

    // Presets also travel as JSON in operator tooling; keep the derive
    // compatible with both formats.
    #[test]
    fn json_roundtrip_preserves_the_preset() {
        let p = Preset::default();
        let json = serde_json::to_string(&p).unwrap();
        let back: Preset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn inverted_band_is_rejected() {
        let mut p = Preset::default();
        p.temp_hot.min = 40.0;
        p.temp_hot.max = 30.0;
        assert!(matches!(p.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn nan_gain_is_rejected() {
        let mut p = Preset::default();
        p.pid.ki = f32::NAN;
        assert!(p.validate().is_err());
    }

    #[test]
    fn out_of_range_hour_is_rejected() {
        let mut p = Preset::default();
        p.light.off_hour = 24;
        assert!(p.validate().is_err());
    }

    #[test]
    fn extreme_temperature_target_is_rejected() {
        let mut p = Preset::default();
        p.temp_cool.target = 120.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn zero_overtemp_offset_is_rejected() {
        let mut p = Preset::default();
        p.safety.overtemp_offset = 0.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn empty_species_is_rejected() {
        let mut p = Preset::default();
        p.species.clear();
        assert!(p.validate().is_err());
    }
}
