//! Vivaria: reptile-habitat climate-control firmware for the ESP32-C6.
//!
//! The crate is split hexagonally. [`app`] holds the hardware-independent
//! orchestration core and the port traits it drives everything through;
//! [`control`], [`safety`], [`scheduler`] and [`telemetry`] are the pure
//! policy modules it composes; [`sensors`], [`drivers`] and [`adapters`]
//! bind the ports to ESP-IDF on target and to simulations on the host.
//!
//! Two build profiles share this tree: the mains-powered full node runs
//! the continuous control loop in the binary, and the `battery-node`
//! feature selects the wake/measure/report/sleep cycle in
//! [`app::battery`].

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod events;
pub mod pins;
pub mod safety;
pub mod scheduler;
pub mod sensors;
pub mod telemetry;

pub use error::{Error, Result};
