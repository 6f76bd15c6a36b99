//! SHT40 relative-humidity sensor on I2C.
//!
//! One high-precision measurement command per read; the response carries
//! temperature and humidity words, each with a CRC byte. Only the humidity
//! word is used here, the probes own the temperature story.

use log::debug;

use crate::error::SensorError;

/// SHT40 fixed bus address.
pub const SHT40_ADDR: u8 = 0x44;

/// High-precision measurement command.
const CMD_MEASURE_HIGH: u8 = 0xFD;

/// Converts the raw humidity word per the SHT4x datasheet, clamped to the
/// physical range.
pub fn raw_to_rh(raw: u16) -> f32 {
    let rh = -6.0 + 125.0 * f32::from(raw) / 65535.0;
    rh.clamp(0.0, 100.0)
}

/// Sensirion CRC-8: poly 0x31, init 0xFF.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0xFFu8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

pub struct HumiditySensor {
    #[cfg(feature = "espidf")]
    port: esp_idf_sys::i2c_port_t,
    #[cfg(not(feature = "espidf"))]
    sim_rh: f32,
}

impl HumiditySensor {
    #[cfg(feature = "espidf")]
    pub fn new(port: esp_idf_sys::i2c_port_t) -> Result<Self, SensorError> {
        Ok(Self { port })
    }

    #[cfg(not(feature = "espidf"))]
    pub fn new() -> Result<Self, SensorError> {
        Ok(Self { sim_rh: 60.0 })
    }

    /// Reads relative humidity in percent.
    pub fn read(&mut self) -> Result<f32, SensorError> {
        let raw = self.read_raw()?;
        let rh = raw_to_rh(raw);
        debug!("humidity {rh:.1} %");
        Ok(rh)
    }

    #[cfg(feature = "espidf")]
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        use esp_idf_sys as sys;

        let cmd = [CMD_MEASURE_HIGH];
        let mut response = [0u8; 6];
        // SAFETY: master transactions on a bus configured at hw_init.
        unsafe {
            if sys::i2c_master_write_to_device(
                self.port,
                SHT40_ADDR,
                cmd.as_ptr(),
                cmd.len(),
                pdms(20),
            ) != sys::ESP_OK
            {
                return Err(SensorError::I2cReadFailed);
            }
            // Datasheet: high-precision conversion takes up to 8.3 ms.
            sys::vTaskDelay(pdms(10));
            if sys::i2c_master_read_from_device(
                self.port,
                SHT40_ADDR,
                response.as_mut_ptr(),
                response.len(),
                pdms(20),
            ) != sys::ESP_OK
            {
                return Err(SensorError::I2cReadFailed);
            }
        }

        // Bytes 3..5 are the humidity word, byte 5 its CRC.
        if crc8(&response[3..5]) != response[5] {
            return Err(SensorError::I2cReadFailed);
        }
        Ok(u16::from_be_bytes([response[3], response[4]]))
    }

    #[cfg(not(feature = "espidf"))]
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        Ok((((self.sim_rh + 6.0) * 65535.0) / 125.0) as u16)
    }
}

#[cfg(feature = "espidf")]
fn pdms(ms: u32) -> u32 {
    ms / (1000 / esp_idf_sys::configTICK_RATE_HZ)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_conversion_spans_the_datasheet_range() {
        assert_eq!(raw_to_rh(0), 0.0);
        assert_eq!(raw_to_rh(65535), 100.0);
        let mid = raw_to_rh(0x8000);
        assert!((56.0..57.0).contains(&mid));
    }

    #[test]
    fn crc8_matches_the_sensirion_example() {
        // Datasheet example: 0xBEEF -> 0x92.
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[cfg(not(feature = "espidf"))]
    #[test]
    fn simulated_sensor_roundtrips_within_quantisation() {
        let mut s = HumiditySensor::new().unwrap();
        let rh = s.read().unwrap();
        assert!((59.9..60.1).contains(&rh));
    }
}
