//! Deep-sleep control for the battery node.

use log::info;

use crate::app::ports::PowerPort;

pub struct DeepSleepPower {
    first_boot: bool,
}

impl DeepSleepPower {
    #[cfg(feature = "espidf")]
    pub fn new() -> Self {
        // SAFETY: plain cause query.
        let cause = unsafe { esp_idf_sys::esp_sleep_get_wakeup_cause() };
        Self {
            // Anything but a timer wake means we came from a cold start.
            first_boot: cause != esp_idf_sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER,
        }
    }

    #[cfg(not(feature = "espidf"))]
    pub fn new() -> Self {
        Self { first_boot: true }
    }
}

impl Default for DeepSleepPower {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerPort for DeepSleepPower {
    fn is_first_boot(&self) -> bool {
        self.first_boot
    }

    #[cfg(feature = "espidf")]
    fn enter_deep_sleep(&mut self, secs: u32) {
        info!("entering deep sleep for {secs} s");
        // SAFETY: standard timer-wake deep sleep; does not return.
        unsafe {
            esp_idf_sys::esp_sleep_enable_timer_wakeup(u64::from(secs) * 1_000_000);
            esp_idf_sys::esp_deep_sleep_start();
        }
    }

    #[cfg(not(feature = "espidf"))]
    fn enter_deep_sleep(&mut self, secs: u32) {
        info!("host build: would deep sleep {secs} s");
        self.first_boot = false;
    }
}
