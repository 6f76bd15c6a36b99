//! Adaptive sensor-poll interval for battery nodes.
//!
//! A sleepy node spends almost all of its energy budget on wake-ups, so the
//! poll period is scaled by how fast the temperature is moving: a stable
//! enclosure earns the slow period, a changing one gets polled at the fast
//! period, and anything in between interpolates linearly.

/// Poll-interval tuning. All periods are in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptivePollConfig {
    /// Period used when the temperature is moving at or past `delta_high`.
    pub fast_period_secs: u32,
    /// Period used when the temperature is perfectly stable.
    pub slow_period_secs: u32,
    /// Absolute per-sample change (°C) that forces the fast period.
    pub delta_high: f32,
}

impl Default for AdaptivePollConfig {
    fn default() -> Self {
        Self {
            fast_period_secs: 30,
            slow_period_secs: 300,
            delta_high: 1.0,
        }
    }
}

/// Returns the next poll period for the observed temperature change.
///
/// A non-positive `delta_high` disables the adaptation and always returns
/// the fast period, which is the safe direction to fail in.
pub fn next_poll_secs(config: &AdaptivePollConfig, current: f32, previous: f32) -> u32 {
    let delta = (current - previous).abs();

    if config.delta_high <= 0.0 || delta >= config.delta_high {
        return config.fast_period_secs;
    }

    let ratio = delta / config.delta_high;
    // saturating_sub tolerates a config with the periods swapped.
    let span = config.slow_period_secs.saturating_sub(config.fast_period_secs) as f32;
    config.slow_period_secs.saturating_sub((ratio * span) as u32)
}
