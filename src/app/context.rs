//! Shared orchestration state: the latest sensor snapshot and the actuator
//! commands derived from it.

use crate::safety::SafetyStatus;

/// Most recent sensor readings. A failed read leaves the implausible
/// sentinel in place so the safety ladder classifies it as a sensor fault
/// instead of the value silently going stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    pub temp_hot: f32,
    pub temp_cool: f32,
    pub humidity: f32,
    pub battery_pct: Option<f32>,
    /// Uptime when the snapshot was taken, microseconds.
    pub taken_at_us: i64,
}

/// Sentinel standing in for a reading that could not be taken. Far outside
/// the plausible range, so it always trips the range check.
pub const READING_INVALID: f32 = -999.0;

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            temp_hot: READING_INVALID,
            temp_cool: READING_INVALID,
            humidity: READING_INVALID,
            battery_pct: None,
            taken_at_us: 0,
        }
    }
}

/// Desired actuator outputs, recomputed each control tick and applied as
/// one unit. Faults reset this to all-off before it reaches hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorCommands {
    /// Heater duty in percent, 0..=100.
    pub heater_duty: u8,
    /// Light brightness in per-mille, 0..=1000.
    pub light_level: u16,
}

impl ActuatorCommands {
    pub const ALL_OFF: Self = Self {
        heater_duty: 0,
        light_level: 0,
    };
}

/// Current safety posture, carried between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyState {
    pub status: SafetyStatus,
    /// Latched by an emergency-stop command; only a reboot clears it.
    pub latched: bool,
}

impl Default for SafetyState {
    fn default() -> Self {
        Self {
            status: SafetyStatus::Ok,
            latched: false,
        }
    }
}
