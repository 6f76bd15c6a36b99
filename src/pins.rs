//! Board pin map for the ESP32-C6 controller PCB, rev B.
//!
//! Kept in one place so a board spin is a one-file change.

/// 1-wire bus shared by the two DS18B20 temperature probes.
pub const ONEWIRE_GPIO: i32 = 10;

/// I2C bus for the SHT40 humidity sensor.
pub const I2C_SDA_GPIO: i32 = 6;
pub const I2C_SCL_GPIO: i32 = 7;

/// Heater SSR drive.
pub const SSR_HEATER_GPIO: i32 = 4;

/// Auxiliary SSR drive (heat mat or CHE).
pub const SSR_AUX_GPIO: i32 = 5;

/// LEDC dimmer output for the light bar.
pub const DIMMER_GPIO: i32 = 8;

/// Battery divider sense input (battery build only).
pub const BATTERY_ADC_GPIO: i32 = 2;
