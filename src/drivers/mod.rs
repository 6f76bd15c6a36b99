//! Actuator drivers and board bring-up.

pub mod dimmer;
pub mod hw_init;
pub mod ssr;
pub mod watchdog;

pub use dimmer::Dimmer;
pub use ssr::SsrBank;
pub use watchdog::Watchdog;
