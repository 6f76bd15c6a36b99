//! Operator commands accepted over the mesh uplink.

use crate::config::Preset;

/// A command addressed to the orchestrator. Arrives via
/// [`crate::events::Event::CommandReceived`].
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Replace the active preset without persisting it.
    UpdatePreset(Preset),
    /// Persist the active preset to storage.
    SavePreset,
    /// Retarget the hot-zone setpoint only.
    SetSetpoint(f32),
    /// Latch the fault state and cut all outputs.
    EmergencyStop,
}
