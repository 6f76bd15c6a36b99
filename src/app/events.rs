//! Notable application events, reported through the
//! [`EventSink`](crate::app::ports::EventSink) port.

use crate::safety::SafetyStatus;

/// Something an operator or log consumer would want to know about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// The safety status changed.
    StatusChanged {
        from: SafetyStatus,
        to: SafetyStatus,
    },
    /// A hard fault was enforced: all outputs were cut.
    FaultEnforced(SafetyStatus),
    /// The system recovered from a fault to a non-fault status.
    FaultCleared(SafetyStatus),
    /// A telemetry frame was transmitted, with its encoded length.
    TelemetrySent(usize),
    /// A telemetry transmission failed.
    TelemetryDropped,
    /// The active preset changed.
    PresetUpdated,
    /// The active preset was written to storage.
    PresetSaved,
}
