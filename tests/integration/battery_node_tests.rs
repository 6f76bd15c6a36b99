//! Wake-cycle tests for the sleepy battery node: several consecutive
//! wakes against persistent storage, checking the adaptive sleep interval
//! and the rationed battery sampling.

use std::collections::HashMap;

use vivaria::app::battery::run_wake_cycle;
use vivaria::app::ports::{NetworkPort, PowerPort, SensorPort, StoragePort, Zone};
use vivaria::config::Preset;
use vivaria::error::{CommsError, Error, Result as VResult, SensorError};
use vivaria::safety::SafetyStatus;
use vivaria::telemetry;

const SEC: i64 = 1_000_000;

struct NodeSensors {
    temp_hot: f32,
    temp_cool: f32,
    battery_reads: u32,
}

impl SensorPort for NodeSensors {
    fn read_temperature(&mut self, zone: Zone) -> Result<f32, SensorError> {
        Ok(match zone {
            Zone::Hot => self.temp_hot,
            Zone::Cool => self.temp_cool,
        })
    }

    fn read_humidity(&mut self) -> Result<f32, SensorError> {
        Ok(58.0)
    }

    fn read_battery_percent(&mut self) -> Option<f32> {
        self.battery_reads += 1;
        Some(82.0)
    }
}

#[derive(Default)]
struct NodeUplink {
    frames: Vec<Vec<u8>>,
    attached: bool,
}

impl NetworkPort for NodeUplink {
    fn is_connected(&self) -> bool {
        self.attached
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), CommsError> {
        if !self.attached {
            return Err(CommsError::NotConnected);
        }
        self.frames.push(frame.to_vec());
        Ok(())
    }
}

struct NodePower {
    first_boot: bool,
}

impl PowerPort for NodePower {
    fn is_first_boot(&self) -> bool {
        self.first_boot
    }

    fn enter_deep_sleep(&mut self, _secs: u32) {}
}

#[derive(Default)]
struct NodeStorage {
    blobs: HashMap<String, Vec<u8>>,
}

impl StoragePort for NodeStorage {
    fn get_blob(&mut self, key: &str, buf: &mut [u8]) -> VResult<Option<usize>> {
        match self.blobs.get(key) {
            Some(v) if v.len() <= buf.len() => {
                buf[..v.len()].copy_from_slice(v);
                Ok(Some(v.len()))
            }
            Some(_) => Err(Error::Config("blob larger than buffer")),
            None => Ok(None),
        }
    }

    fn set_blob(&mut self, key: &str, value: &[u8]) -> VResult<()> {
        self.blobs.insert(key.into(), value.to_vec());
        Ok(())
    }
}

struct Rig {
    sensors: NodeSensors,
    uplink: NodeUplink,
    storage: NodeStorage,
    wakes: u32,
}

impl Rig {
    fn new() -> Self {
        Self {
            sensors: NodeSensors {
                temp_hot: 31.0,
                temp_cool: 26.0,
                battery_reads: 0,
            },
            uplink: NodeUplink {
                frames: Vec::new(),
                attached: true,
            },
            storage: NodeStorage::default(),
            wakes: 0,
        }
    }

    fn wake(&mut self) -> u32 {
        self.wakes += 1;
        let power = NodePower {
            first_boot: self.wakes == 1,
        };
        run_wake_cycle(
            &Preset::default(),
            &mut self.sensors,
            &mut self.uplink,
            &power,
            &mut self.storage,
            i64::from(self.wakes) * 60 * SEC,
        )
    }
}

#[test]
fn first_wake_reports_everything_and_sleeps_fast() {
    let mut rig = Rig::new();
    let sleep = rig.wake();

    assert_eq!(sleep, 30);
    assert_eq!(rig.uplink.frames.len(), 1);
    assert_eq!(rig.sensors.battery_reads, 1);

    let report = telemetry::decode(&rig.uplink.frames[0]).unwrap();
    assert_eq!(report.temp_hot, 31.0);
    assert_eq!(report.humidity, 58.0);
    assert_eq!(report.battery_pct, Some(82.0));
    // A sleepy node drives nothing, so the duty fields never go out.
    assert_eq!(report.heater_duty, None);
    assert_eq!(report.light_duty, None);
    assert_eq!(report.safety_status, Some(SafetyStatus::Ok));
}

#[test]
fn sleep_interval_tracks_temperature_movement() {
    let mut rig = Rig::new();
    rig.wake();

    // Stable: slow period.
    assert_eq!(rig.wake(), 300);

    // Drifting half the threshold: interpolated.
    rig.sensors.temp_hot = 31.5;
    assert_eq!(rig.wake(), 165);

    // Swinging fast: fast period.
    rig.sensors.temp_hot = 33.0;
    assert_eq!(rig.wake(), 30);
}

#[test]
fn battery_is_rationed_across_wakes() {
    let mut rig = Rig::new();
    for _ in 0..11 {
        rig.wake();
    }
    assert_eq!(rig.sensors.battery_reads, 1);

    rig.wake();
    assert_eq!(rig.sensors.battery_reads, 2);
}

#[test]
fn unattached_mesh_drops_the_frame_but_still_sleeps() {
    let mut rig = Rig::new();
    rig.uplink.attached = false;

    let sleep = rig.wake();
    assert_eq!(sleep, 30);
    assert!(rig.uplink.frames.is_empty());

    // State still advanced: the next wake has history and sleeps slow.
    rig.uplink.attached = true;
    assert_eq!(rig.wake(), 300);
}

#[test]
fn overtemp_wake_reports_the_fault() {
    let mut rig = Rig::new();
    rig.sensors.temp_hot = 40.0;
    rig.sensors.temp_cool = 30.0;
    rig.wake();

    let report = telemetry::decode(&rig.uplink.frames[0]).unwrap();
    assert_eq!(report.safety_status, Some(SafetyStatus::FaultOvertemp));
}
