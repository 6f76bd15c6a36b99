//! Port traits: the seams between the domain core and the hardware.
//!
//! The orchestrator only ever talks to these traits. On target they are
//! implemented by the ESP-IDF adapters; in tests by recording mocks. This
//! is what lets the entire control, safety and telemetry logic run and be
//! asserted on a host machine.

use crate::error::{CommsError, SensorError};

/// Which side of the thermal gradient a probe sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Hot,
    Cool,
}

/// Environmental inputs.
pub trait SensorPort {
    /// Reads one zone's temperature in °C.
    fn read_temperature(&mut self, zone: Zone) -> Result<f32, SensorError>;

    /// Reads relative humidity in percent.
    fn read_humidity(&mut self) -> Result<f32, SensorError>;

    /// Reads the battery charge in percent. `None` on mains-powered
    /// hardware with no battery rail.
    fn read_battery_percent(&mut self) -> Option<f32>;
}

/// Actuator outputs. Implementations must make `all_off` unconditional:
/// it is the fault-response path and may not fail or defer.
pub trait ActuatorPort {
    /// Sets the heater duty in percent, 0..=100.
    fn set_heater_duty(&mut self, duty: u8);

    /// Sets the light brightness in per-mille, 0..=1000.
    fn set_light_level(&mut self, level: u16);

    /// Drops every output to its de-energised state immediately.
    fn all_off(&mut self);
}

/// Uplink for telemetry frames.
pub trait NetworkPort {
    fn is_connected(&self) -> bool;

    /// Transmits one encoded frame.
    fn send(&mut self, frame: &[u8]) -> Result<(), CommsError>;
}

/// Monotonic and wall-clock time.
pub trait TimePort {
    /// Microseconds since boot. Monotonic.
    fn uptime_us(&self) -> i64;

    /// Local wall-clock time as (hour, minute), if the clock has been
    /// synchronised. The photoperiod holds its last state while `None`.
    fn local_time(&self) -> Option<(u8, u8)>;
}

/// Preset persistence.
pub trait PresetPort {
    /// Loads the stored preset. `Ok(None)` means nothing stored yet.
    fn load(&mut self) -> Result<Option<crate::config::Preset>, crate::error::Error>;

    fn save(&mut self, preset: &crate::config::Preset) -> Result<(), crate::error::Error>;
}

/// Raw key/value blob storage beneath [`PresetPort`], also used by the
/// battery node for its wake-to-wake state.
pub trait StoragePort {
    fn get_blob(&mut self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, crate::error::Error>;

    fn set_blob(&mut self, key: &str, value: &[u8]) -> Result<(), crate::error::Error>;
}

/// Deep-sleep control for the battery node.
pub trait PowerPort {
    /// True only on the first wake after a power-on reset.
    fn is_first_boot(&self) -> bool;

    /// Enters deep sleep for `secs` seconds. Does not return on target.
    fn enter_deep_sleep(&mut self, secs: u32);
}

/// Observer of notable application events, for logging and diagnostics.
pub trait EventSink {
    fn emit(&mut self, event: &crate::app::events::AppEvent);
}

/// A sink that drops everything. Useful in tests that do not assert on
/// the event stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&mut self, _event: &crate::app::events::AppEvent) {}
}
