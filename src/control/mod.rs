//! Closed-loop control: the heater PID and the battery-node poll scheduler.

pub mod adaptive_poll;
pub mod pid;

pub use adaptive_poll::{next_poll_secs, AdaptivePollConfig};
pub use pid::PidController;
