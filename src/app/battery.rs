//! Battery-node duty cycle: wake, measure, report, sleep.
//!
//! A sleepy node keeps no long-running tasks. Each wake runs this cycle
//! once: sample the sensors, run the safety ladder in one-shot form,
//! transmit a frame, pick the next wake interval from how fast the
//! temperature is moving, and go back to deep sleep. State that must
//! survive sleep (the previous temperature and the battery-check counter)
//! is persisted through the storage port.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::context::READING_INVALID;
use crate::app::ports::{NetworkPort, PowerPort, SensorPort, StoragePort, Zone};
use crate::config::Preset;
use crate::control::{next_poll_secs, AdaptivePollConfig};
use crate::safety::{SafetyConfig, SafetyMonitor};
use crate::telemetry::{self, TelemetryReport};

/// Storage key for the wake-to-wake state blob.
const STATE_KEY: &str = "bat_state";

/// Battery voltage is sampled only every Nth wake; the divider burns a
/// little current and the charge level moves slowly.
const BATTERY_CHECK_INTERVAL: u16 = 10;

/// Longest the node waits for the mesh to attach before giving up on this
/// cycle's frame. Milliseconds.
pub const CONNECT_WAIT_MS: u32 = 5_000;

/// State carried across deep sleep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleepState {
    pub prev_temp: f32,
    pub battery_check_counter: u16,
}

impl Default for SleepState {
    fn default() -> Self {
        Self {
            prev_temp: READING_INVALID,
            battery_check_counter: 0,
        }
    }
}

impl SleepState {
    pub fn load<S: StoragePort>(storage: &mut S) -> Self {
        let mut buf = [0u8; 16];
        match storage.get_blob(STATE_KEY, &mut buf) {
            Ok(Some(len)) => postcard::from_bytes(&buf[..len]).unwrap_or_default(),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("sleep-state load failed: {e}");
                Self::default()
            }
        }
    }

    pub fn store<S: StoragePort>(&self, storage: &mut S) {
        let mut buf = [0u8; 16];
        match postcard::to_slice(self, &mut buf) {
            Ok(written) => {
                if let Err(e) = storage.set_blob(STATE_KEY, written) {
                    warn!("sleep-state store failed: {e}");
                }
            }
            Err(_) => warn!("sleep-state serialise failed"),
        }
    }
}

/// One complete wake cycle. Returns the chosen sleep interval in seconds;
/// the caller (which owns the power port) actually enters sleep.
pub fn run_wake_cycle<S, N, P, St>(
    preset: &Preset,
    sensors: &mut S,
    network: &mut N,
    power: &P,
    storage: &mut St,
    now_us: i64,
) -> u32
where
    S: SensorPort,
    N: NetworkPort,
    P: PowerPort,
    St: StoragePort,
{
    let mut state = SleepState::load(storage);

    let temp_hot = sensors
        .read_temperature(Zone::Hot)
        .unwrap_or(READING_INVALID);
    let temp_cool = sensors
        .read_temperature(Zone::Cool)
        .unwrap_or(READING_INVALID);
    let humidity = sensors.read_humidity().unwrap_or(READING_INVALID);

    // One-shot safety evaluation: the history-based checks are meaningless
    // across a deep-sleep gap, so only range, mismatch and overtemp apply.
    let mut safety = SafetyMonitor::new(SafetyConfig {
        overtemp_offset: preset.safety.overtemp_offset,
        heater_max_on_secs: 0,
        sensor_stale_secs: 0,
        mismatch_threshold: 15.0,
        max_rate_c_per_sec: 0.0,
    });
    let status = safety.check(temp_hot, temp_cool, preset.temp_hot.target, now_us);

    // Battery sampling is rationed to every Nth wake.
    let battery_pct = if power.is_first_boot() || state.battery_check_counter >= BATTERY_CHECK_INTERVAL
    {
        state.battery_check_counter = 0;
        sensors.read_battery_percent()
    } else {
        state.battery_check_counter += 1;
        None
    };

    let mut report = TelemetryReport::new(temp_hot, temp_cool, humidity);
    report.battery_pct = battery_pct;
    report.safety_status = Some(status);
    // A sleepy node drives no actuators, so the duty fields stay absent.

    let mut buf = [0u8; telemetry::MIN_ENCODE_BUF];
    match telemetry::encode(&report, &mut buf) {
        Ok(len) => {
            if network.is_connected() {
                match network.send(&buf[..len]) {
                    Ok(()) => info!("report sent, {len} bytes, status {status:?}"),
                    Err(e) => warn!("report send failed: {e}"),
                }
            } else {
                warn!("mesh not attached within {CONNECT_WAIT_MS} ms, dropping report");
            }
        }
        Err(e) => warn!("report encode failed: {e}"),
    }

    let poll = AdaptivePollConfig::default();
    let sleep_secs = if state.prev_temp > -900.0 {
        next_poll_secs(&poll, temp_hot, state.prev_temp)
    } else {
        // No history on the very first wake.
        poll.fast_period_secs
    };

    state.prev_temp = temp_hot;
    state.store(storage);

    info!("sleeping {sleep_secs} s");
    sleep_secs
}
