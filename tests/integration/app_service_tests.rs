//! End-to-end orchestration tests: full scheduling cycles against the
//! recording mock, asserting the safety-over-control contract.

use vivaria::app::events::AppEvent;
use vivaria::app::AppCommand;
use vivaria::app::AppService;
use vivaria::config::Preset;
use vivaria::error::SensorError;
use vivaria::safety::SafetyStatus;
use vivaria::telemetry;

use crate::mock_hw::{ActuatorCall, MockHardware, MockPresets, RecordingSink};

const SEC: i64 = 1_000_000;

/// Runs one full scheduling cycle in the production dispatch order.
fn run_cycle(
    svc: &mut AppService,
    hw: &mut MockHardware,
    sink: &mut RecordingSink,
    now_us: i64,
    local_time: Option<(u8, u8)>,
) {
    svc.safety_tick(now_us, hw, sink);
    svc.sensing_tick(hw, now_us);
    svc.control_tick(local_time, hw);
}

fn warmed_up(hw: &mut MockHardware, sink: &mut RecordingSink) -> AppService {
    let mut svc = AppService::new(Preset::default());
    // First cycle starts from the invalid snapshot and recovers.
    run_cycle(&mut svc, hw, sink, SEC, Some((12, 0)));
    run_cycle(&mut svc, hw, sink, 2 * SEC, Some((12, 0)));
    run_cycle(&mut svc, hw, sink, 3 * SEC, Some((12, 0)));
    svc
}

#[test]
fn steady_state_heats_a_cool_enclosure_and_lights_the_day() {
    let mut hw = MockHardware::nominal();
    hw.temp_hot = Ok(28.0);
    let mut sink = RecordingSink::default();

    let svc = warmed_up(&mut hw, &mut sink);

    assert_eq!(svc.status(), SafetyStatus::Ok);
    assert!(hw.heater_duty > 0);
    assert_eq!(hw.light_level, 1000);
}

#[test]
fn overtemp_is_enforced_before_control_can_act() {
    let mut hw = MockHardware::nominal();
    let mut sink = RecordingSink::default();
    let mut svc = warmed_up(&mut hw, &mut sink);
    assert!(hw.heater_duty > 0 || hw.light_level > 0);

    // Climb just under the plausibility rate limit so the ladder reaches
    // the overtemp rung instead of rejecting the readings outright.
    for (sec, temp) in [(4, 32.9), (5, 34.8), (6, 36.7), (7, 38.6)] {
        hw.temp_hot = Ok(temp);
        run_cycle(&mut svc, &mut hw, &mut sink, sec * SEC, Some((12, 0)));
    }
    // The safety tick judges the previous cycle's snapshot, so 38.6 is
    // first seen by the cycle after it was sensed.
    let before = hw.actuator_calls.len();
    run_cycle(&mut svc, &mut hw, &mut sink, 8 * SEC, Some((12, 0)));

    assert_eq!(svc.status(), SafetyStatus::FaultOvertemp);
    assert_eq!(hw.heater_duty, 0);
    assert_eq!(hw.light_level, 0);

    // After the fault the only actuator traffic is the shutdown itself:
    // the control tick stopped commanding outputs entirely.
    assert!(hw.actuator_calls[before..]
        .iter()
        .all(|c| *c == ActuatorCall::AllOff));
    assert!(sink
        .events
        .contains(&AppEvent::FaultEnforced(SafetyStatus::FaultOvertemp)));
}

#[test]
fn fault_recovery_restores_control_and_reports_it() {
    let mut hw = MockHardware::nominal();
    let mut sink = RecordingSink::default();
    let mut svc = warmed_up(&mut hw, &mut sink);

    hw.temp_hot = Err(SensorError::BusReadFailed);
    run_cycle(&mut svc, &mut hw, &mut sink, 4 * SEC, Some((12, 0)));
    run_cycle(&mut svc, &mut hw, &mut sink, 5 * SEC, Some((12, 0)));
    assert_eq!(svc.status(), SafetyStatus::FaultSensor);

    hw.temp_hot = Ok(28.0);
    run_cycle(&mut svc, &mut hw, &mut sink, 6 * SEC, Some((12, 0)));
    run_cycle(&mut svc, &mut hw, &mut sink, 7 * SEC, Some((12, 0)));
    assert_eq!(svc.status(), SafetyStatus::Ok);
    // Clearing the fault resets the PID, and the first tick afterwards is
    // swallowed by the derivative kick from the empty history.
    assert_eq!(hw.heater_duty, 0);

    run_cycle(&mut svc, &mut hw, &mut sink, 8 * SEC, Some((12, 0)));
    assert!(hw.heater_duty > 0);
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::FaultCleared(_))));
}

#[test]
fn heater_timeout_trips_after_continuous_saturation() {
    let mut preset = Preset::default();
    preset.safety.heater_max_on_secs = 60;
    let mut hw = MockHardware::nominal();
    // Pin the enclosure just warm enough to stay in range but cold enough
    // that the PID saturates and never cycles the heater off.
    hw.temp_hot = Ok(20.0);
    hw.temp_cool = Ok(18.0);
    let mut sink = RecordingSink::default();
    let mut svc = AppService::new(preset);

    let mut tripped_at = None;
    for sec in 1..=120 {
        run_cycle(&mut svc, &mut hw, &mut sink, sec * SEC, Some((12, 0)));
        if svc.status() == SafetyStatus::FaultHeaterTimeout {
            tripped_at = Some(sec);
            break;
        }
    }

    let sec = tripped_at.expect("heater timeout never tripped");
    // One cycle of startup slack on top of the configured minute.
    assert!((60..=62).contains(&sec), "tripped at {sec}");
    assert_eq!(hw.heater_duty, 0);
}

#[test]
fn telemetry_frame_reflects_the_enclosure() {
    let mut hw = MockHardware::nominal();
    hw.temp_hot = Ok(28.0);
    let mut sink = RecordingSink::default();
    let mut svc = warmed_up(&mut hw, &mut sink);

    svc.telemetry_tick(&mut hw, &mut sink);

    let report = telemetry::decode(&hw.sent_frames[0]).unwrap();
    assert_eq!(report.temp_hot, 28.0);
    assert_eq!(report.temp_cool, 26.0);
    assert_eq!(report.humidity, 60.0);
    assert_eq!(report.battery_pct, None);
    assert_eq!(report.heater_duty, Some(f32::from(hw.heater_duty)));
    assert_eq!(report.safety_status, Some(SafetyStatus::Ok));
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::TelemetrySent(_))));
}

#[test]
fn telemetry_send_failure_is_reported_not_fatal() {
    let mut hw = MockHardware::nominal();
    let mut sink = RecordingSink::default();
    let mut svc = warmed_up(&mut hw, &mut sink);

    hw.network_up = false;
    svc.telemetry_tick(&mut hw, &mut sink);
    assert!(sink.events.contains(&AppEvent::TelemetryDropped));

    // Control keeps running regardless.
    hw.network_up = true;
    run_cycle(&mut svc, &mut hw, &mut sink, 10 * SEC, Some((12, 0)));
    assert_eq!(svc.status(), SafetyStatus::Ok);
}

#[test]
fn photoperiod_follows_the_wall_clock_through_a_day() {
    let mut hw = MockHardware::nominal();
    let mut sink = RecordingSink::default();
    let mut svc = warmed_up(&mut hw, &mut sink);

    let mut now = 10 * SEC;
    let mut at = |svc: &mut AppService, hw: &mut MockHardware, sink: &mut RecordingSink, h, m| {
        now += SEC;
        run_cycle(svc, hw, sink, now, Some((h, m)));
        hw.light_level
    };

    assert_eq!(at(&mut svc, &mut hw, &mut sink, 3, 0), 0);
    assert_eq!(at(&mut svc, &mut hw, &mut sink, 7, 15), 500);
    assert_eq!(at(&mut svc, &mut hw, &mut sink, 12, 0), 1000);
    assert_eq!(at(&mut svc, &mut hw, &mut sink, 18, 45), 500);
    assert_eq!(at(&mut svc, &mut hw, &mut sink, 21, 0), 0);
}

#[test]
fn preset_update_retunes_the_running_controller() {
    let mut hw = MockHardware::nominal();
    let mut sink = RecordingSink::default();
    let mut svc = warmed_up(&mut hw, &mut sink);
    let mut presets = MockPresets::new();

    let mut hotter = Preset::default();
    hotter.temp_hot.target = 35.0;
    hotter.temp_hot.max = 38.0;
    svc.handle_command(
        AppCommand::UpdatePreset(hotter),
        10 * SEC,
        &mut hw,
        &mut presets,
        &mut sink,
    );
    assert!(sink.events.contains(&AppEvent::PresetUpdated));
    assert_eq!(svc.preset().temp_hot.target, 35.0);

    // 31 degrees was near target before; against 35 it demands heat.
    run_cycle(&mut svc, &mut hw, &mut sink, 11 * SEC, Some((12, 0)));
    assert!(hw.heater_duty > 0);

    // The debounced save lands once the window passes.
    svc.maybe_persist_preset(16 * SEC, &mut presets, &mut sink);
    assert_eq!(presets.saved.len(), 1);
    assert_eq!(presets.saved[0].temp_hot.target, 35.0);
}

#[test]
fn failed_deferred_save_retries_next_cycle() {
    let mut hw = MockHardware::nominal();
    let mut sink = RecordingSink::default();
    let mut svc = warmed_up(&mut hw, &mut sink);
    let mut presets = MockPresets::new();
    presets.fail_saves = true;

    svc.handle_command(
        AppCommand::SetSetpoint(30.0),
        10 * SEC,
        &mut hw,
        &mut presets,
        &mut sink,
    );
    svc.maybe_persist_preset(16 * SEC, &mut presets, &mut sink);
    assert!(presets.saved.is_empty());

    presets.fail_saves = false;
    svc.maybe_persist_preset(17 * SEC, &mut presets, &mut sink);
    assert_eq!(presets.saved.len(), 1);
}

#[test]
fn emergency_stop_outlives_healthy_readings() {
    let mut hw = MockHardware::nominal();
    let mut sink = RecordingSink::default();
    let mut svc = warmed_up(&mut hw, &mut sink);
    let mut presets = MockPresets::new();

    svc.handle_command(
        AppCommand::EmergencyStop,
        10 * SEC,
        &mut hw,
        &mut presets,
        &mut sink,
    );
    assert!(svc.status().is_fault());
    assert!(hw.all_off_count() >= 1);

    for sec in 11..30 {
        run_cycle(&mut svc, &mut hw, &mut sink, sec * SEC, Some((12, 0)));
    }
    assert!(svc.status().is_fault());
    assert_eq!(hw.heater_duty, 0);
}
