//! Application layer: the hardware-independent orchestration core and the
//! port traits it drives hardware through.

pub mod battery;
pub mod commands;
pub mod context;
pub mod events;
pub mod ports;
pub mod service;

pub use commands::AppCommand;
pub use events::AppEvent;
pub use service::AppService;
