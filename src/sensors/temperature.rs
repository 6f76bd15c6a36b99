//! DS18B20 temperature probes on a shared 1-wire bus.
//!
//! Two probes, one per thermal zone, addressed by their 64-bit ROM codes.
//! The raw conversion is 1/16 °C per LSB in a signed 16-bit register; the
//! scratchpad is CRC-checked before the value is believed.

use log::debug;

use crate::app::ports::Zone;
use crate::error::SensorError;

/// DS18B20 resolution: sixteenths of a degree.
const LSB_PER_DEGREE: f32 = 16.0;

/// Converts a raw scratchpad temperature register to °C.
pub fn raw_to_celsius(raw: i16) -> f32 {
    f32::from(raw) / LSB_PER_DEGREE
}

/// Dallas/Maxim CRC-8 (poly 0x31 reflected) over a scratchpad prefix.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut byte = byte;
        for _ in 0..8 {
            let mix = (crc ^ byte) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            byte >>= 1;
        }
    }
    crc
}

pub struct TemperatureProbes {
    #[cfg(feature = "espidf")]
    bus_gpio: i32,
    #[cfg(not(feature = "espidf"))]
    sim: SimProbes,
}

#[cfg(not(feature = "espidf"))]
struct SimProbes {
    hot: f32,
    cool: f32,
}

impl TemperatureProbes {
    #[cfg(feature = "espidf")]
    pub fn new(bus_gpio: i32) -> Result<Self, SensorError> {
        Ok(Self { bus_gpio })
    }

    #[cfg(not(feature = "espidf"))]
    pub fn new(_bus_gpio: i32) -> Result<Self, SensorError> {
        Ok(Self {
            sim: SimProbes {
                hot: 31.0,
                cool: 26.0,
            },
        })
    }

    /// Triggers a conversion on the zone's probe and reads it back.
    pub fn read(&mut self, zone: Zone) -> Result<f32, SensorError> {
        let raw = self.read_raw(zone)?;
        let temp = raw_to_celsius(raw);
        debug!("{zone:?} probe {temp:.2} C");
        Ok(temp)
    }

    #[cfg(feature = "espidf")]
    fn read_raw(&mut self, zone: Zone) -> Result<i16, SensorError> {
        use log::warn;
        let scratchpad = onewire::read_scratchpad(self.bus_gpio, zone).map_err(|_| {
            warn!("1-wire transaction failed on {zone:?} probe");
            SensorError::BusReadFailed
        })?;
        if crc8(&scratchpad[..8]) != scratchpad[8] {
            warn!("scratchpad CRC mismatch on {zone:?} probe");
            return Err(SensorError::BusReadFailed);
        }
        Ok(i16::from_le_bytes([scratchpad[0], scratchpad[1]]))
    }

    #[cfg(not(feature = "espidf"))]
    fn read_raw(&mut self, zone: Zone) -> Result<i16, SensorError> {
        let temp = match zone {
            Zone::Hot => self.sim.hot,
            Zone::Cool => self.sim.cool,
        };
        Ok((temp * LSB_PER_DEGREE) as i16)
    }
}

#[cfg(feature = "espidf")]
mod onewire {
    //! Bit-banged 1-wire transactions against the RMT-less fallback path.

    use super::Zone;
    use esp_idf_sys as sys;

    /// ROM codes of the two probes, found at board bring-up.
    const ROM_HOT: u64 = 0x28_41_9C_12_00_00_00_6B;
    const ROM_COOL: u64 = 0x28_7F_02_13_00_00_00_D4;

    pub fn read_scratchpad(bus_gpio: i32, zone: Zone) -> Result<[u8; 9], i32> {
        let rom = match zone {
            Zone::Hot => ROM_HOT,
            Zone::Cool => ROM_COOL,
        };
        let mut scratchpad = [0u8; 9];

        reset(bus_gpio)?;
        write_byte(bus_gpio, 0x55); // MATCH ROM
        for i in 0..8 {
            write_byte(bus_gpio, (rom >> (i * 8)) as u8);
        }
        write_byte(bus_gpio, 0x44); // CONVERT T
        // 12-bit conversion time.
        unsafe { sys::vTaskDelay(750 / (1000 / sys::configTICK_RATE_HZ)) };

        reset(bus_gpio)?;
        write_byte(bus_gpio, 0x55);
        for i in 0..8 {
            write_byte(bus_gpio, (rom >> (i * 8)) as u8);
        }
        write_byte(bus_gpio, 0xBE); // READ SCRATCHPAD
        for slot in scratchpad.iter_mut() {
            *slot = read_byte(bus_gpio);
        }
        Ok(scratchpad)
    }

    fn reset(gpio: i32) -> Result<(), i32> {
        // SAFETY: open-drain presence pulse on the owned bus pin.
        unsafe {
            sys::gpio_set_direction(gpio, sys::gpio_mode_t_GPIO_MODE_OUTPUT_OD);
            sys::gpio_set_level(gpio, 0);
            sys::esp_rom_delay_us(480);
            sys::gpio_set_level(gpio, 1);
            sys::esp_rom_delay_us(70);
            let present = sys::gpio_get_level(gpio) == 0;
            sys::esp_rom_delay_us(410);
            if present { Ok(()) } else { Err(-1) }
        }
    }

    fn write_byte(gpio: i32, mut byte: u8) {
        for _ in 0..8 {
            let bit = byte & 1;
            // SAFETY: timed slot writes on the owned bus pin.
            unsafe {
                sys::gpio_set_level(gpio, 0);
                if bit != 0 {
                    sys::esp_rom_delay_us(6);
                    sys::gpio_set_level(gpio, 1);
                    sys::esp_rom_delay_us(64);
                } else {
                    sys::esp_rom_delay_us(60);
                    sys::gpio_set_level(gpio, 1);
                    sys::esp_rom_delay_us(10);
                }
            }
            byte >>= 1;
        }
    }

    fn read_byte(gpio: i32) -> u8 {
        let mut byte = 0u8;
        for i in 0..8 {
            // SAFETY: timed slot reads on the owned bus pin.
            unsafe {
                sys::gpio_set_level(gpio, 0);
                sys::esp_rom_delay_us(6);
                sys::gpio_set_level(gpio, 1);
                sys::esp_rom_delay_us(9);
                if sys::gpio_get_level(gpio) != 0 {
                    byte |= 1 << i;
                }
                sys::esp_rom_delay_us(55);
            }
        }
        byte
    }
}
