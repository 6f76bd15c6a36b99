//! Event sink that forwards application events to the log.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::StatusChanged { from, to } => info!("status {from:?} -> {to:?}"),
            AppEvent::FaultEnforced(status) => warn!("fault enforced: {status:?}"),
            AppEvent::FaultCleared(status) => info!("fault cleared, now {status:?}"),
            AppEvent::TelemetrySent(len) => info!("telemetry sent ({len} bytes)"),
            AppEvent::TelemetryDropped => warn!("telemetry dropped"),
            AppEvent::PresetUpdated => info!("preset updated"),
            AppEvent::PresetSaved => info!("preset saved"),
        }
    }
}
