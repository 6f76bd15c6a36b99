//! Time sources: monotonic uptime for the safety checks, wall clock for
//! the photoperiod.

use crate::app::ports::TimePort;

/// Seconds between 1970-01-01 and 2020-01-01. Anything earlier means SNTP
/// has not synchronised yet and the wall clock cannot be trusted.
const EPOCH_2020_SECS: i64 = 1_577_836_800;

#[derive(Debug, Default)]
pub struct SystemTime;

impl TimePort for SystemTime {
    #[cfg(feature = "espidf")]
    fn uptime_us(&self) -> i64 {
        // SAFETY: plain monotonic counter read.
        unsafe { esp_idf_sys::esp_timer_get_time() }
    }

    #[cfg(not(feature = "espidf"))]
    fn uptime_us(&self) -> i64 {
        use std::sync::OnceLock;
        use std::time::Instant;
        static START: OnceLock<Instant> = OnceLock::new();
        let start = START.get_or_init(Instant::now);
        start.elapsed().as_micros() as i64
    }

    #[cfg(feature = "espidf")]
    fn local_time(&self) -> Option<(u8, u8)> {
        // SAFETY: libc time calls with valid out-pointers.
        unsafe {
            let mut now: esp_idf_sys::time_t = 0;
            esp_idf_sys::time(&mut now);
            if i64::from(now) < EPOCH_2020_SECS {
                return None;
            }
            let mut tm: esp_idf_sys::tm = core::mem::zeroed();
            esp_idf_sys::localtime_r(&now, &mut tm);
            Some((tm.tm_hour as u8, tm.tm_min as u8))
        }
    }

    #[cfg(not(feature = "espidf"))]
    fn local_time(&self) -> Option<(u8, u8)> {
        use std::time::{SystemTime as StdTime, UNIX_EPOCH};
        let secs = StdTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs() as i64;
        if secs < EPOCH_2020_SECS {
            return None;
        }
        // UTC is fine for the host build; only tests use it.
        let minutes_of_day = (secs / 60) % 1440;
        Some(((minutes_of_day / 60) as u8, (minutes_of_day % 60) as u8))
    }
}
