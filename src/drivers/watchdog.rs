//! Task watchdog wrapper.
//!
//! The main loop subscribes itself to the TWDT and feeds it once per
//! scheduling cycle. A wedged loop (deadlocked bus, runaway fade, stuck
//! flash write) then resets the node instead of leaving the heater in
//! whatever state it last commanded.

use crate::error::{ActuatorError, Error};

/// Watchdog timeout. Generous against the 100 ms loop period so a slow
/// NVS commit cannot cause a spurious reset.
pub const WATCHDOG_TIMEOUT_SECS: u32 = 10;

pub struct Watchdog {
    subscribed: bool,
}

impl Watchdog {
    /// Subscribes the current task to the TWDT.
    #[cfg(feature = "espidf")]
    pub fn subscribe() -> Result<Self, Error> {
        use esp_idf_sys as sys;
        // SAFETY: registers the calling task with the already-initialised
        // watchdog; null means "current task".
        let rc = unsafe { sys::esp_task_wdt_add(core::ptr::null_mut()) };
        if rc != sys::ESP_OK {
            return Err(Error::Init("task watchdog subscribe failed"));
        }
        Ok(Self { subscribed: true })
    }

    #[cfg(not(feature = "espidf"))]
    pub fn subscribe() -> Result<Self, Error> {
        Ok(Self { subscribed: true })
    }

    /// Feeds the watchdog. Call once per scheduling cycle.
    #[cfg(feature = "espidf")]
    pub fn feed(&mut self) -> Result<(), Error> {
        use esp_idf_sys as sys;
        if !self.subscribed {
            return Err(Error::Actuator(ActuatorError::NotInitialised));
        }
        // SAFETY: task was subscribed in subscribe().
        let rc = unsafe { sys::esp_task_wdt_reset() };
        if rc != sys::ESP_OK {
            return Err(Error::Init("task watchdog feed failed"));
        }
        Ok(())
    }

    #[cfg(not(feature = "espidf"))]
    pub fn feed(&mut self) -> Result<(), Error> {
        if !self.subscribed {
            return Err(Error::Actuator(ActuatorError::NotInitialised));
        }
        Ok(())
    }
}
