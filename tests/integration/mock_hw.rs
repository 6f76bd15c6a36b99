//! Recording mock hardware shared by the integration tests.
//!
//! Every port call is recorded so tests assert on the sequence of effects
//! the orchestrator produced, not just the final state.

use vivaria::app::events::AppEvent;
use vivaria::app::ports::{ActuatorPort, EventSink, NetworkPort, SensorPort, Zone};
use vivaria::config::Preset;
use vivaria::error::{CommsError, Error, Result as VResult, SensorError};

/// What the mock's actuator side was last told, plus a call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    HeaterDuty(u8),
    LightLevel(u16),
    AllOff,
}

pub struct MockHardware {
    pub temp_hot: Result<f32, SensorError>,
    pub temp_cool: Result<f32, SensorError>,
    pub humidity: Result<f32, SensorError>,
    pub battery: Option<f32>,

    pub heater_duty: u8,
    pub light_level: u16,
    pub actuator_calls: Vec<ActuatorCall>,

    pub sent_frames: Vec<Vec<u8>>,
    pub network_up: bool,
}

impl MockHardware {
    /// A healthy enclosure near its targets.
    pub fn nominal() -> Self {
        Self {
            temp_hot: Ok(31.0),
            temp_cool: Ok(26.0),
            humidity: Ok(60.0),
            battery: None,
            heater_duty: 0,
            light_level: 0,
            actuator_calls: Vec::new(),
            sent_frames: Vec::new(),
            network_up: true,
        }
    }

    pub fn all_off_count(&self) -> usize {
        self.actuator_calls
            .iter()
            .filter(|c| **c == ActuatorCall::AllOff)
            .count()
    }
}

impl SensorPort for MockHardware {
    fn read_temperature(&mut self, zone: Zone) -> Result<f32, SensorError> {
        match zone {
            Zone::Hot => self.temp_hot,
            Zone::Cool => self.temp_cool,
        }
    }

    fn read_humidity(&mut self) -> Result<f32, SensorError> {
        self.humidity
    }

    fn read_battery_percent(&mut self) -> Option<f32> {
        self.battery
    }
}

impl ActuatorPort for MockHardware {
    fn set_heater_duty(&mut self, duty: u8) {
        self.heater_duty = duty;
        self.actuator_calls.push(ActuatorCall::HeaterDuty(duty));
    }

    fn set_light_level(&mut self, level: u16) {
        self.light_level = level;
        self.actuator_calls.push(ActuatorCall::LightLevel(level));
    }

    fn all_off(&mut self) {
        self.heater_duty = 0;
        self.light_level = 0;
        self.actuator_calls.push(ActuatorCall::AllOff);
    }
}

impl NetworkPort for MockHardware {
    fn is_connected(&self) -> bool {
        self.network_up
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), CommsError> {
        if !self.network_up {
            return Err(CommsError::NotConnected);
        }
        self.sent_frames.push(frame.to_vec());
        Ok(())
    }
}

/// Recording preset port.
pub struct MockPresets {
    pub saved: Vec<Preset>,
    pub fail_saves: bool,
}

impl MockPresets {
    pub fn new() -> Self {
        Self {
            saved: Vec::new(),
            fail_saves: false,
        }
    }
}

impl vivaria::app::ports::PresetPort for MockPresets {
    fn load(&mut self) -> VResult<Option<Preset>> {
        Ok(self.saved.last().cloned())
    }

    fn save(&mut self, preset: &Preset) -> VResult<()> {
        if self.fail_saves {
            return Err(Error::Config("simulated save failure"));
        }
        self.saved.push(preset.clone());
        Ok(())
    }
}

/// Event sink that keeps everything it sees.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}
