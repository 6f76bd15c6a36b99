//! Photoperiod scheduler with sunrise/sunset fades.
//!
//! Works entirely in minutes-of-day so it is trivially testable and immune
//! to clock granularity. Nocturnal schedules (lights on across midnight)
//! are supported by letting the on-minute exceed the off-minute.

use crate::config::LightSchedule;

const MINUTES_PER_DAY: u32 = 1440;

/// Lighting output for one evaluation instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightState {
    /// Whether the photoperiod window is open.
    pub on: bool,
    /// Fractional brightness 0.0..=1.0, already shaped by any fade.
    pub level: f32,
}

impl LightState {
    pub const OFF: Self = Self { on: false, level: 0.0 };
}

/// Evaluates the schedule at `now_min` minutes past local midnight.
pub fn evaluate(schedule: &LightSchedule, now_min: u32) -> LightState {
    let now_min = now_min % MINUTES_PER_DAY;
    let on_min = u32::from(schedule.on_hour) * 60;
    let off_min = u32::from(schedule.off_hour) * 60;

    if !in_window(now_min, on_min, off_min) {
        return LightState::OFF;
    }

    let since_on = wrapped_delta(now_min, on_min);
    let until_off = wrapped_delta(off_min, now_min);

    let sunrise = u32::from(schedule.sunrise_minutes);
    let sunset = u32::from(schedule.sunset_minutes);

    let level = if sunrise > 0 && since_on < sunrise {
        since_on as f32 / sunrise as f32
    } else if sunset > 0 && until_off < sunset {
        until_off as f32 / sunset as f32
    } else {
        1.0
    };

    LightState {
        on: true,
        level: level.clamp(0.0, 1.0),
    }
}

/// Half-open window test: `[on, off)`, wrapping at midnight when the
/// on-minute is later than the off-minute.
fn in_window(now: u32, on: u32, off: u32) -> bool {
    if on == off {
        // Degenerate schedule: never on.
        false
    } else if on < off {
        now >= on && now < off
    } else {
        now >= on || now < off
    }
}

/// Minutes from `from` forward to `to`, wrapping at midnight.
fn wrapped_delta(to: u32, from: u32) -> u32 {
    (to + MINUTES_PER_DAY - from) % MINUTES_PER_DAY
}
