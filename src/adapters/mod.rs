//! Concrete implementations of the application ports: real peripherals on
//! target, deterministic stand-ins on the host.

pub mod hardware;
pub mod log_sink;
pub mod mesh;
pub mod nvs;
pub mod power;
pub mod time;

pub use hardware::HardwareAdapter;
pub use log_sink::LogEventSink;
pub use mesh::MeshUplink;
pub use nvs::NvsStorage;
pub use power::DeepSleepPower;
pub use time::SystemTime;
