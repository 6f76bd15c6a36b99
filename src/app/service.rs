//! The orchestration core.
//!
//! `AppService` owns every piece of mutable control state: the active
//! preset, the PID controller, the safety monitor, the latest sensor
//! snapshot and the actuator commands derived from it. All hardware access
//! goes through the port traits, so the whole control policy runs on the
//! host in tests.
//!
//! Tick ordering is the load-bearing invariant here: within one scheduling
//! cycle the loop always runs safety before sensing before control before
//! telemetry. The safety tick therefore judges the snapshot the previous
//! cycle acted on, and a fault cuts outputs before the control tick can
//! re-energise anything.

use log::{info, warn};

use crate::app::commands::AppCommand;
use crate::app::context::{ActuatorCommands, SafetyState, SensorSnapshot, READING_INVALID};
use crate::app::events::AppEvent;
use crate::app::ports::{ActuatorPort, EventSink, NetworkPort, PresetPort, SensorPort, Zone};
use crate::config::Preset;
use crate::control::PidController;
use crate::safety::{SafetyConfig, SafetyMonitor, SafetyStatus};
use crate::scheduler;
use crate::telemetry::{self, TelemetryReport};

/// Seconds between each PID/safety evaluation. The loop runs faster than
/// this for the duty quantiser, but control math always sees this step.
pub const CONTROL_PERIOD_SECS: f32 = 1.0;

/// Debounce for persisting an updated preset. Commands often arrive in
/// bursts while an operator drags a slider; one write at the end is enough.
const PRESET_SAVE_DEBOUNCE_US: i64 = 5_000_000;

/// Cross-probe agreement threshold used by the full node. Wider than the
/// monitor default because hot and cool zones legitimately differ by the
/// thermal-gradient design.
const MISMATCH_THRESHOLD_C: f32 = 15.0;

pub struct AppService {
    preset: Preset,
    pid: PidController,
    safety: SafetyMonitor,
    snapshot: SensorSnapshot,
    commands: ActuatorCommands,
    safety_state: SafetyState,
    preset_dirty_since_us: Option<i64>,
}

impl AppService {
    pub fn new(preset: Preset) -> Self {
        let pid = PidController::new(
            preset.pid.kp,
            preset.pid.ki,
            preset.pid.kd,
            preset.temp_hot.target,
        );
        let safety = SafetyMonitor::new(safety_config_for(&preset));
        Self {
            preset,
            pid,
            safety,
            snapshot: SensorSnapshot::default(),
            commands: ActuatorCommands::ALL_OFF,
            safety_state: SafetyState::default(),
            preset_dirty_since_us: None,
        }
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    pub fn status(&self) -> SafetyStatus {
        self.safety_state.status
    }

    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    pub fn commands(&self) -> ActuatorCommands {
        self.commands
    }

    /// Samples every sensor into the snapshot. A failed read stores the
    /// invalid sentinel so the next safety tick classifies it instead of
    /// the stale value lingering.
    pub fn sensing_tick<S: SensorPort>(&mut self, sensors: &mut S, now_us: i64) {
        self.snapshot = SensorSnapshot {
            temp_hot: sensors
                .read_temperature(Zone::Hot)
                .unwrap_or(READING_INVALID),
            temp_cool: sensors
                .read_temperature(Zone::Cool)
                .unwrap_or(READING_INVALID),
            humidity: sensors.read_humidity().unwrap_or(READING_INVALID),
            battery_pct: sensors.read_battery_percent(),
            taken_at_us: now_us,
        };
    }

    /// Runs the fault ladder and enforces the result. Must be dispatched
    /// before the control tick of the same cycle.
    pub fn safety_tick<A: ActuatorPort, E: EventSink>(
        &mut self,
        now_us: i64,
        actuators: &mut A,
        sink: &mut E,
    ) {
        // The heater-on counter tracks what was actually commanded during
        // the elapsed second.
        self.safety.heater_tick(self.commands.heater_duty > 0);

        let status = self.safety.check(
            self.snapshot.temp_hot,
            self.snapshot.temp_cool,
            self.preset.temp_hot.target,
            now_us,
        );
        self.transition(status, actuators, sink);
    }

    fn transition<A: ActuatorPort, E: EventSink>(
        &mut self,
        status: SafetyStatus,
        actuators: &mut A,
        sink: &mut E,
    ) {
        let prev = self.safety_state.status;
        let status = if self.safety_state.latched {
            // An emergency stop holds until reboot regardless of readings.
            prev.max(status)
        } else {
            status
        };

        if status != prev {
            sink.emit(&AppEvent::StatusChanged { from: prev, to: status });
        }

        if status.is_fault() {
            if !prev.is_fault() {
                warn!("safety fault {status:?}: cutting all outputs");
                sink.emit(&AppEvent::FaultEnforced(status));
            }
            self.commands = ActuatorCommands::ALL_OFF;
            actuators.all_off();
            self.safety.emergency_shutdown();
        } else if prev.is_fault() {
            info!("safety fault cleared, resuming control");
            // The enclosure drifted while outputs were cut; stale integral
            // and derivative history would kick the heater on recovery.
            self.pid.reset();
            sink.emit(&AppEvent::FaultCleared(status));
        }

        self.safety_state.status = status;
    }

    /// Recomputes actuator commands from the snapshot and applies them.
    ///
    /// `local_time` is `(hour, minute)` when the wall clock is known; the
    /// photoperiod output holds its last value while it is not.
    pub fn control_tick<A: ActuatorPort>(
        &mut self,
        local_time: Option<(u8, u8)>,
        actuators: &mut A,
    ) {
        if self.safety_state.status.is_fault() {
            // Outputs were already cut by the safety tick. Skipping here
            // keeps a fault from being overwritten mid-cycle.
            return;
        }

        let output = self
            .pid
            .compute(self.snapshot.temp_hot, CONTROL_PERIOD_SECS);
        self.commands.heater_duty = if output.is_nan() || output < 0.0 {
            0
        } else {
            output.min(100.0) as u8
        };

        if let Some((hour, minute)) = local_time {
            let now_min = u32::from(hour) * 60 + u32::from(minute);
            let light = scheduler::evaluate(&self.preset.light, now_min);
            self.commands.light_level = (light.level * 1000.0) as u16;
        }

        actuators.set_heater_duty(self.commands.heater_duty);
        actuators.set_light_level(self.commands.light_level);
    }

    /// Encodes the current state and transmits it.
    pub fn telemetry_tick<N: NetworkPort, E: EventSink>(
        &mut self,
        network: &mut N,
        sink: &mut E,
    ) {
        let mut report = TelemetryReport::new(
            self.snapshot.temp_hot,
            self.snapshot.temp_cool,
            self.snapshot.humidity,
        );
        report.battery_pct = self.snapshot.battery_pct;
        report.heater_duty = Some(f32::from(self.commands.heater_duty));
        report.light_duty = Some(f32::from(self.commands.light_level) / 10.0);
        report.safety_status = Some(self.safety_state.status);

        let mut buf = [0u8; telemetry::MIN_ENCODE_BUF];
        let len = match telemetry::encode(&report, &mut buf) {
            Ok(len) => len,
            Err(e) => {
                warn!("telemetry encode failed: {e}");
                sink.emit(&AppEvent::TelemetryDropped);
                return;
            }
        };

        match network.send(&buf[..len]) {
            Ok(()) => sink.emit(&AppEvent::TelemetrySent(len)),
            Err(e) => {
                warn!("telemetry send failed: {e}");
                sink.emit(&AppEvent::TelemetryDropped);
            }
        }
    }

    /// Applies an operator command.
    pub fn handle_command<A, E, P>(
        &mut self,
        command: AppCommand,
        now_us: i64,
        actuators: &mut A,
        presets: &mut P,
        sink: &mut E,
    ) where
        A: ActuatorPort,
        E: EventSink,
        P: PresetPort,
    {
        match command {
            AppCommand::UpdatePreset(preset) => {
                if let Err(e) = preset.validate() {
                    warn!("rejecting preset update: {e}");
                    return;
                }
                info!("preset updated: {}", preset.species.as_str());
                self.apply_preset(preset);
                self.preset_dirty_since_us = Some(now_us);
                sink.emit(&AppEvent::PresetUpdated);
            }
            AppCommand::SavePreset => {
                if let Err(e) = presets.save(&self.preset) {
                    warn!("preset save failed: {e}");
                } else {
                    self.preset_dirty_since_us = None;
                    sink.emit(&AppEvent::PresetSaved);
                }
            }
            AppCommand::SetSetpoint(setpoint) => {
                if !setpoint.is_finite() {
                    warn!("rejecting non-finite setpoint");
                    return;
                }
                info!("hot-zone setpoint -> {setpoint:.1}");
                self.preset.temp_hot.target = setpoint;
                self.pid.set_setpoint(setpoint);
                self.preset_dirty_since_us = Some(now_us);
            }
            AppCommand::EmergencyStop => {
                warn!("emergency stop commanded");
                self.safety_state.latched = true;
                self.transition(SafetyStatus::FaultOvertemp, actuators, sink);
            }
        }
    }

    /// Persists a dirty preset once the debounce window has elapsed.
    /// Call once per scheduling cycle.
    pub fn maybe_persist_preset<P: PresetPort, E: EventSink>(
        &mut self,
        now_us: i64,
        presets: &mut P,
        sink: &mut E,
    ) {
        let Some(dirty_since) = self.preset_dirty_since_us else {
            return;
        };
        if now_us - dirty_since < PRESET_SAVE_DEBOUNCE_US {
            return;
        }
        match presets.save(&self.preset) {
            Ok(()) => {
                self.preset_dirty_since_us = None;
                sink.emit(&AppEvent::PresetSaved);
            }
            Err(e) => {
                // Keep the dirty mark; the next cycle retries.
                warn!("deferred preset save failed: {e}");
            }
        }
    }

    fn apply_preset(&mut self, preset: Preset) {
        self.pid
            .set_gains(preset.pid.kp, preset.pid.ki, preset.pid.kd);
        self.pid.set_setpoint(preset.temp_hot.target);
        self.safety.set_config(safety_config_for(&preset));
        self.preset = preset;
    }
}

fn safety_config_for(preset: &Preset) -> SafetyConfig {
    SafetyConfig {
        overtemp_offset: preset.safety.overtemp_offset,
        heater_max_on_secs: preset.safety.heater_max_on_secs,
        mismatch_threshold: MISMATCH_THRESHOLD_C,
        ..SafetyConfig::default()
    }
}
