//! Binds the real drivers to the sensor and actuator ports.

use log::warn;

use crate::app::ports::{ActuatorPort, SensorPort, Zone};
use crate::drivers::ssr::SSR_CHANNELS;
use crate::drivers::{Dimmer, SsrBank};
use crate::error::{Error, SensorError};
use crate::pins;
use crate::sensors::{BatteryGauge, HumiditySensor, TemperatureProbes};

/// SSR bank channel carrying the heater.
const HEATER_CHANNEL: usize = 0;

pub struct HardwareAdapter {
    probes: TemperatureProbes,
    humidity: HumiditySensor,
    battery: Option<BatteryGauge>,
    ssr: SsrBank,
    dimmer: Dimmer,
}

impl HardwareAdapter {
    /// Brings up every peripheral. `with_battery` attaches the divider
    /// gauge; mains-powered boards leave it off and report no charge.
    pub fn new(with_battery: bool) -> Result<Self, Error> {
        crate::drivers::hw_init::init_board()?;

        let battery = if with_battery {
            Some(Self::new_gauge()?)
        } else {
            None
        };

        Ok(Self {
            probes: TemperatureProbes::new(pins::ONEWIRE_GPIO)?,
            humidity: Self::new_humidity()?,
            battery,
            ssr: SsrBank::new(pins::SSR_HEATER_GPIO, pins::SSR_AUX_GPIO)?,
            dimmer: Self::new_dimmer()?,
        })
    }

    /// Advances the SSR duty quantiser. Call every 100 ms from the loop.
    pub fn quantizer_tick(&mut self, tick: u32) {
        self.ssr.tick(tick);
    }

    /// Re-arms the SSR bank after a cleared fault.
    pub fn rearm(&mut self) {
        for ch in 0..SSR_CHANNELS {
            // Channel count is fixed, the index cannot be invalid.
            let _ = self.ssr.enable(ch);
        }
    }

    #[cfg(feature = "espidf")]
    fn new_humidity() -> Result<HumiditySensor, SensorError> {
        HumiditySensor::new(0)
    }

    #[cfg(not(feature = "espidf"))]
    fn new_humidity() -> Result<HumiditySensor, SensorError> {
        HumiditySensor::new()
    }

    #[cfg(feature = "espidf")]
    fn new_gauge() -> Result<BatteryGauge, SensorError> {
        BatteryGauge::new(esp_idf_sys::adc_channel_t_ADC_CHANNEL_2)
    }

    #[cfg(not(feature = "espidf"))]
    fn new_gauge() -> Result<BatteryGauge, SensorError> {
        BatteryGauge::new()
    }

    #[cfg(feature = "espidf")]
    fn new_dimmer() -> Result<Dimmer, crate::error::ActuatorError> {
        Dimmer::new(
            pins::DIMMER_GPIO,
            esp_idf_sys::ledc_channel_t_LEDC_CHANNEL_0,
        )
    }

    #[cfg(not(feature = "espidf"))]
    fn new_dimmer() -> Result<Dimmer, crate::error::ActuatorError> {
        Dimmer::new(pins::DIMMER_GPIO)
    }
}

impl SensorPort for HardwareAdapter {
    fn read_temperature(&mut self, zone: Zone) -> Result<f32, SensorError> {
        self.probes.read(zone)
    }

    fn read_humidity(&mut self) -> Result<f32, SensorError> {
        self.humidity.read()
    }

    fn read_battery_percent(&mut self) -> Option<f32> {
        let gauge = self.battery.as_mut()?;
        match gauge.read_percent() {
            Ok(pct) => Some(pct),
            Err(e) => {
                warn!("battery read failed: {e}");
                None
            }
        }
    }
}

impl ActuatorPort for HardwareAdapter {
    fn set_heater_duty(&mut self, duty: u8) {
        if let Err(e) = self.ssr.set_duty(HEATER_CHANNEL, duty) {
            warn!("heater duty write failed: {e}");
        }
    }

    fn set_light_level(&mut self, level: u16) {
        // Short hardware fade smooths the once-per-second scheduler steps.
        if let Err(e) = self.dimmer.fade_to(level, 500) {
            warn!("dimmer write failed: {e}");
        }
    }

    fn all_off(&mut self) {
        self.ssr.force_off_all();
        if let Err(e) = self.dimmer.set(0) {
            warn!("dimmer shutdown write failed: {e}");
        }
    }
}
