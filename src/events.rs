//! Tick events driving the orchestration loop.
//!
//! The main loop is a single consumer draining one queue; timers and the
//! command channel are the producers. Each event carries a dispatch
//! priority so a drained batch can be handled in severity order no matter
//! the arrival order: safety always preempts sensing, sensing always
//! precedes control, and telemetry runs last.

use heapless::spsc::Queue;

use crate::app::commands::AppCommand;

/// Queue depth. One full scheduling cycle enqueues at most four events,
/// so sixteen slots absorb a stalled consumer for several cycles.
pub const EVENT_QUEUE_DEPTH: usize = 16;

/// A unit of work for the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Run the safety ladder and enforce any fault.
    SafetyTick,
    /// Sample all sensors into the shared snapshot.
    SensorTick,
    /// Run PID and photoperiod, then push actuator commands.
    ControlTick,
    /// Encode and transmit a telemetry frame.
    TelemetryTick,
    /// An operator command arrived over the mesh.
    CommandReceived(AppCommand),
    /// Feed the task watchdog.
    WatchdogTick,
}

impl Event {
    /// Dispatch priority; lower runs first within a drained batch.
    pub fn priority(&self) -> u8 {
        match self {
            Self::SafetyTick => 0,
            Self::SensorTick => 10,
            Self::ControlTick => 20,
            Self::TelemetryTick => 30,
            Self::CommandReceived(_) => 31,
            Self::WatchdogTick => 50,
        }
    }
}

/// Single-producer single-consumer tick queue.
pub type EventQueue = Queue<Event, EVENT_QUEUE_DEPTH>;
