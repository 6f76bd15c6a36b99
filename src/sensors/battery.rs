//! Battery gauge: ADC divider sampling and charge estimation.
//!
//! The pack voltage is halved by a resistive divider before the ADC, so
//! readings are doubled back. Sixteen samples are averaged per read to
//! knock down ADC noise; charge percent is a linear map over the usable
//! LiPo range, which is crude but monotonic and good enough for a
//! "replace me soon" indicator.

use log::debug;

use crate::error::SensorError;

/// Divider ratio: pack voltage is twice the ADC pin voltage.
const DIVIDER_RATIO: u32 = 2;

/// Samples averaged per read.
const SAMPLE_COUNT: u32 = 16;

/// Pack millivolts treated as 100 %.
const FULL_MV: u32 = 4200;

/// Pack millivolts treated as 0 %.
const EMPTY_MV: u32 = 3000;

/// Linear charge estimate from pack millivolts, clamped to 0..=100.
pub fn percent_from_mv(pack_mv: u32) -> f32 {
    if pack_mv >= FULL_MV {
        return 100.0;
    }
    if pack_mv <= EMPTY_MV {
        return 0.0;
    }
    (pack_mv - EMPTY_MV) as f32 * 100.0 / (FULL_MV - EMPTY_MV) as f32
}

pub struct BatteryGauge {
    #[cfg(feature = "espidf")]
    adc_handle: esp_idf_sys::adc_oneshot_unit_handle_t,
    #[cfg(feature = "espidf")]
    adc_channel: esp_idf_sys::adc_channel_t,
    #[cfg(not(feature = "espidf"))]
    sim_pack_mv: u32,
}

impl BatteryGauge {
    #[cfg(feature = "espidf")]
    pub fn new(adc_channel: esp_idf_sys::adc_channel_t) -> Result<Self, SensorError> {
        use esp_idf_sys as sys;
        let unit_config = sys::adc_oneshot_unit_init_cfg_t {
            unit_id: sys::adc_unit_t_ADC_UNIT_1,
            ..Default::default()
        };
        let mut handle: sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        // SAFETY: one-time unit and channel configuration with valid structs.
        unsafe {
            if sys::adc_oneshot_new_unit(&unit_config, &mut handle) != sys::ESP_OK {
                return Err(SensorError::AdcReadFailed);
            }
            let channel_config = sys::adc_oneshot_chan_cfg_t {
                atten: sys::adc_atten_t_ADC_ATTEN_DB_12,
                bitwidth: sys::adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            if sys::adc_oneshot_config_channel(handle, adc_channel, &channel_config)
                != sys::ESP_OK
            {
                return Err(SensorError::AdcReadFailed);
            }
        }
        Ok(Self {
            adc_handle: handle,
            adc_channel,
        })
    }

    #[cfg(not(feature = "espidf"))]
    pub fn new() -> Result<Self, SensorError> {
        Ok(Self { sim_pack_mv: 3900 })
    }

    /// Reads the averaged pack voltage in millivolts.
    pub fn read_pack_mv(&mut self) -> Result<u32, SensorError> {
        let mut sum = 0u32;
        for _ in 0..SAMPLE_COUNT {
            sum += self.read_pin_mv_once()?;
        }
        let pack = (sum / SAMPLE_COUNT) * DIVIDER_RATIO;
        debug!("battery pack {pack} mV");
        Ok(pack)
    }

    /// Reads the charge estimate in percent.
    pub fn read_percent(&mut self) -> Result<f32, SensorError> {
        Ok(percent_from_mv(self.read_pack_mv()?))
    }

    #[cfg(feature = "espidf")]
    fn read_pin_mv_once(&mut self) -> Result<u32, SensorError> {
        use esp_idf_sys as sys;
        let mut raw: core::ffi::c_int = 0;
        // SAFETY: oneshot read on a channel configured at init.
        let rc = unsafe { sys::adc_oneshot_read(self.adc_handle, self.adc_channel, &mut raw) };
        if rc != sys::ESP_OK {
            return Err(SensorError::AdcReadFailed);
        }
        // 12-bit raw against the 3.3 V calibrated rail.
        Ok(raw as u32 * 3300 / 4095)
    }

    #[cfg(not(feature = "espidf"))]
    fn read_pin_mv_once(&mut self) -> Result<u32, SensorError> {
        Ok(self.sim_pack_mv / DIVIDER_RATIO)
    }
}
