//! Layered safety monitor.
//!
//! Every check cycle walks a fixed ladder of conditions and reports the
//! first one that trips. The ladder is ordered so that sensor-trust
//! problems are reported before temperature problems: a stale, mismatched
//! or implausibly fast-moving reading means nothing downstream of it can be
//! believed, so those checks fire first even when the reading also looks
//! like an overtemp.
//!
//! Anything at [`SafetyStatus::FaultOvertemp`] or above is a hard fault and
//! the orchestrator must cut all heat before doing anything else. Warnings
//! are advisory only.

use serde::{Deserialize, Serialize};

/// Habitat health, ordered by severity. Comparisons rely on the
/// discriminant order, so new variants must keep warnings below
/// `FaultOvertemp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum SafetyStatus {
    Ok = 0,
    WarnHighTemp = 1,
    WarnLowTemp = 2,
    FaultOvertemp = 3,
    FaultSensor = 4,
    FaultSensorStale = 5,
    FaultSensorMismatch = 6,
    FaultHeaterTimeout = 7,
}

impl SafetyStatus {
    /// True for every status that requires an emergency shutdown.
    pub fn is_fault(self) -> bool {
        self >= Self::FaultOvertemp
    }

    /// Wire code carried in telemetry frames.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a wire code. Unknown codes map to `FaultSensor` so a
    /// corrupted frame can never hide a fault.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::WarnHighTemp,
            2 => Self::WarnLowTemp,
            3 => Self::FaultOvertemp,
            4 => Self::FaultSensor,
            5 => Self::FaultSensorStale,
            6 => Self::FaultSensorMismatch,
            7 => Self::FaultHeaterTimeout,
            _ => Self::FaultSensor,
        }
    }
}

/// Monitor tuning. Any threshold set to zero (or negative, for the float
/// fields) disables its check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyConfig {
    /// Degrees above the hot-zone setpoint that trips `FaultOvertemp`.
    /// The high-temperature warning fires at 70 % of this offset.
    pub overtemp_offset: f32,
    /// Continuous heater-on limit in seconds.
    pub heater_max_on_secs: u32,
    /// Maximum age of the newest valid reading in seconds.
    pub sensor_stale_secs: u32,
    /// Maximum allowed spread between the hot and cool probes (°C).
    pub mismatch_threshold: f32,
    /// Maximum plausible temperature slew rate (°C/s).
    pub max_rate_c_per_sec: f32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            overtemp_offset: 5.0,
            heater_max_on_secs: 3600,
            sensor_stale_secs: 30,
            mismatch_threshold: 10.0,
            max_rate_c_per_sec: 2.0,
        }
    }
}

/// Hard electrical limits of the probes. Anything outside is treated as a
/// wiring or conversion failure, not a real temperature.
const TEMP_VALID_MIN: f32 = -20.0;
const TEMP_VALID_MAX: f32 = 85.0;

/// Sentinel below which `prev_temp` counts as "no previous sample".
const NO_PREV_TEMP: f32 = -900.0;

/// Minimum spacing between rate-check samples. Below this, quantisation
/// noise dominates the computed slope.
const RATE_MIN_DT_SECS: f32 = 0.1;

/// Stateful safety monitor. One instance guards one enclosure.
#[derive(Debug, Clone)]
pub struct SafetyMonitor {
    config: SafetyConfig,
    heater_on_secs: u32,
    last_valid_us: i64,
    prev_temp: f32,
    prev_temp_us: i64,
}

impl SafetyMonitor {
    pub fn new(config: SafetyConfig) -> Self {
        Self {
            config,
            heater_on_secs: 0,
            last_valid_us: 0,
            prev_temp: -999.0,
            prev_temp_us: 0,
        }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SafetyConfig) {
        self.config = config;
    }

    /// Runs the fault ladder against the latest readings.
    ///
    /// `now_us` is the monotonic clock in microseconds; it feeds the
    /// staleness and rate checks. `setpoint` is the hot-zone target the
    /// overtemp checks are relative to.
    pub fn check(&mut self, temp_hot: f32, temp_cool: f32, setpoint: f32, now_us: i64) -> SafetyStatus {
        let valid = |t: f32| t.is_finite() && (TEMP_VALID_MIN..=TEMP_VALID_MAX).contains(&t);

        // 1. Electrical plausibility of either probe.
        if !valid(temp_hot) || !valid(temp_cool) {
            return SafetyStatus::FaultSensor;
        }

        // 2. Staleness of the previous valid sample. Both readings just
        // passed the range check, so the timestamp is refreshed after.
        if self.config.sensor_stale_secs > 0 && self.last_valid_us > 0 {
            let age_secs = (now_us - self.last_valid_us) / 1_000_000;
            if age_secs > i64::from(self.config.sensor_stale_secs) {
                return SafetyStatus::FaultSensorStale;
            }
        }
        self.last_valid_us = now_us;

        // 3. Cross-probe agreement.
        if self.config.mismatch_threshold > 0.0
            && (temp_hot - temp_cool).abs() > self.config.mismatch_threshold
        {
            return SafetyStatus::FaultSensorMismatch;
        }

        // 4. Slew rate of the hot probe. The history is updated whether or
        // not the check fires, so a single spike cannot latch the fault.
        if self.config.max_rate_c_per_sec > 0.0
            && self.prev_temp > NO_PREV_TEMP
            && self.prev_temp_us > 0
        {
            let dt = (now_us - self.prev_temp_us) as f32 / 1_000_000.0;
            if dt > RATE_MIN_DT_SECS {
                let rate = ((temp_hot - self.prev_temp) / dt).abs();
                if rate > self.config.max_rate_c_per_sec {
                    self.prev_temp = temp_hot;
                    self.prev_temp_us = now_us;
                    return SafetyStatus::FaultSensor;
                }
            }
        }
        self.prev_temp = temp_hot;
        self.prev_temp_us = now_us;

        // 5. Hard overtemperature.
        if temp_hot > setpoint + self.config.overtemp_offset {
            return SafetyStatus::FaultOvertemp;
        }

        // 6. Heater stuck on.
        if self.config.heater_max_on_secs > 0 && self.heater_on_secs >= self.config.heater_max_on_secs {
            return SafetyStatus::FaultHeaterTimeout;
        }

        // 7. Approaching the overtemp threshold.
        if temp_hot > setpoint + 0.7 * self.config.overtemp_offset {
            return SafetyStatus::WarnHighTemp;
        }

        SafetyStatus::Ok
    }

    /// Advances the continuous heater-on counter. Call once per second with
    /// whether the heater was energised during that second.
    pub fn heater_tick(&mut self, heater_on: bool) {
        if heater_on {
            self.heater_on_secs = self.heater_on_secs.saturating_add(1);
        } else {
            self.heater_on_secs = 0;
        }
    }

    pub fn heater_on_secs(&self) -> u32 {
        self.heater_on_secs
    }

    /// Clears the heater-on counter after the orchestrator has cut power.
    /// The monitor never touches hardware itself.
    pub fn emergency_shutdown(&mut self) {
        self.heater_on_secs = 0;
    }
}
