//! Sensor drivers. Each compiles against ESP-IDF on target and as a
//! deterministic simulation on the host.

pub mod battery;
pub mod humidity;
pub mod temperature;

pub use battery::BatteryGauge;
pub use humidity::HumiditySensor;
pub use temperature::TemperatureProbes;
