//! Compact binary telemetry codec.
//!
//! Frames are a CBOR-compatible map of small integer keys so any standard
//! CBOR tooling on the receiving side can decode them, while the encoder
//! stays a few dozen lines with no allocation. Optional fields that a node
//! cannot measure (a mains node has no battery, a sleepy node reports no
//! duties) are simply omitted from the map rather than sent as sentinels,
//! keeping frames under 50 bytes.

use crate::error::CodecError;
use crate::safety::SafetyStatus;

/// Integer map keys of the wire format. Stable protocol constants.
mod key {
    pub const TEMP_HOT: u8 = 1;
    pub const TEMP_COOL: u8 = 2;
    pub const HUMIDITY: u8 = 3;
    pub const BATTERY_PCT: u8 = 4;
    pub const HEATER_DUTY: u8 = 5;
    pub const LIGHT_DUTY: u8 = 6;
    pub const SAFETY_STATUS: u8 = 7;
}

/// CBOR major types used by this codec.
const MAJOR_UINT: u8 = 0x00;
const MAJOR_MAP: u8 = 0xA0;
const FLOAT32_HEADER: u8 = 0xFA;

/// Smallest buffer [`encode`] will write into. The worst-case frame is
/// well under this, so a compile-time buffer of this size always works.
pub const MIN_ENCODE_BUF: usize = 64;

/// One telemetry sample. Mandatory readings are plain floats; everything a
/// node might legitimately not have is an `Option` and is omitted from the
/// wire when `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryReport {
    pub temp_hot: f32,
    pub temp_cool: f32,
    pub humidity: f32,
    pub battery_pct: Option<f32>,
    pub heater_duty: Option<f32>,
    pub light_duty: Option<f32>,
    pub safety_status: Option<SafetyStatus>,
}

impl TelemetryReport {
    /// A report with only the mandatory readings populated.
    pub fn new(temp_hot: f32, temp_cool: f32, humidity: f32) -> Self {
        Self {
            temp_hot,
            temp_cool,
            humidity,
            battery_pct: None,
            heater_duty: None,
            light_duty: None,
            safety_status: None,
        }
    }
}

/// Encodes a report into `buf`, returning the number of bytes written.
pub fn encode(report: &TelemetryReport, buf: &mut [u8]) -> Result<usize, CodecError> {
    if buf.len() < MIN_ENCODE_BUF {
        return Err(CodecError::BufferTooSmall);
    }

    let field_count = 3
        + report.battery_pct.is_some() as u8
        + report.heater_duty.is_some() as u8
        + report.light_duty.is_some() as u8
        + report.safety_status.is_some() as u8;

    let mut pos = 0usize;
    buf[pos] = MAJOR_MAP | field_count;
    pos += 1;

    pos = put_float_entry(buf, pos, key::TEMP_HOT, report.temp_hot);
    pos = put_float_entry(buf, pos, key::TEMP_COOL, report.temp_cool);
    pos = put_float_entry(buf, pos, key::HUMIDITY, report.humidity);

    if let Some(v) = report.battery_pct {
        pos = put_float_entry(buf, pos, key::BATTERY_PCT, v);
    }
    if let Some(v) = report.heater_duty {
        pos = put_float_entry(buf, pos, key::HEATER_DUTY, v);
    }
    if let Some(v) = report.light_duty {
        pos = put_float_entry(buf, pos, key::LIGHT_DUTY, v);
    }
    if let Some(status) = report.safety_status {
        pos = put_uint(buf, pos, key::SAFETY_STATUS as u16);
        pos = put_uint(buf, pos, u16::from(status.code()));
    }

    Ok(pos)
}

fn put_uint(buf: &mut [u8], pos: usize, value: u16) -> usize {
    if value < 24 {
        buf[pos] = MAJOR_UINT | value as u8;
        pos + 1
    } else if value <= 0xFF {
        buf[pos] = 0x18;
        buf[pos + 1] = value as u8;
        pos + 2
    } else {
        buf[pos] = 0x19;
        buf[pos + 1..pos + 3].copy_from_slice(&value.to_be_bytes());
        pos + 3
    }
}

fn put_float_entry(buf: &mut [u8], pos: usize, key: u8, value: f32) -> usize {
    let pos = put_uint(buf, pos, u16::from(key));
    buf[pos] = FLOAT32_HEADER;
    buf[pos + 1..pos + 5].copy_from_slice(&value.to_be_bytes());
    pos + 5
}

/// Decodes a frame back into a report.
///
/// Tolerant by design: unknown keys are skipped, a value of an unsupported
/// type ends the parse, and whatever was decoded up to that point is
/// returned. Only an input too short to hold a map header is rejected.
pub fn decode(data: &[u8]) -> Result<TelemetryReport, CodecError> {
    if data.len() < 2 {
        return Err(CodecError::Truncated);
    }

    let mut report = TelemetryReport::new(0.0, 0.0, 0.0);

    if data[0] & 0xE0 != MAJOR_MAP {
        return Ok(report);
    }
    let entries = (data[0] & 0x1F) as usize;

    let mut pos = 1usize;
    for _ in 0..entries {
        let Some((k, next)) = take_uint(data, pos) else {
            break;
        };
        pos = next;

        match take_value(data, pos) {
            Some((value, next)) => {
                pos = next;
                apply_field(&mut report, k, value);
            }
            None => break,
        }
    }

    Ok(report)
}

#[derive(Clone, Copy)]
enum Value {
    Uint(u16),
    Float(f32),
}

fn take_uint(data: &[u8], pos: usize) -> Option<(u16, usize)> {
    let first = *data.get(pos)?;
    if first & 0xE0 != MAJOR_UINT {
        return None;
    }
    match first {
        0..24 => Some((u16::from(first), pos + 1)),
        0x18 => Some((u16::from(*data.get(pos + 1)?), pos + 2)),
        0x19 => {
            let hi = *data.get(pos + 1)?;
            let lo = *data.get(pos + 2)?;
            Some((u16::from_be_bytes([hi, lo]), pos + 3))
        }
        _ => None,
    }
}

fn take_value(data: &[u8], pos: usize) -> Option<(Value, usize)> {
    let first = *data.get(pos)?;
    if first == FLOAT32_HEADER {
        let bytes: [u8; 4] = data.get(pos + 1..pos + 5)?.try_into().ok()?;
        Some((Value::Float(f32::from_be_bytes(bytes)), pos + 5))
    } else if first & 0xE0 == MAJOR_UINT {
        let (v, next) = take_uint(data, pos)?;
        Some((Value::Uint(v), next))
    } else {
        None
    }
}

fn apply_field(report: &mut TelemetryReport, key: u16, value: Value) {
    let as_float = |v: Value| match v {
        Value::Float(f) => f,
        Value::Uint(u) => f32::from(u),
    };
    match key {
        k if k == u16::from(key::TEMP_HOT) => report.temp_hot = as_float(value),
        k if k == u16::from(key::TEMP_COOL) => report.temp_cool = as_float(value),
        k if k == u16::from(key::HUMIDITY) => report.humidity = as_float(value),
        k if k == u16::from(key::BATTERY_PCT) => report.battery_pct = Some(as_float(value)),
        k if k == u16::from(key::HEATER_DUTY) => report.heater_duty = Some(as_float(value)),
        k if k == u16::from(key::LIGHT_DUTY) => report.light_duty = Some(as_float(value)),
        k if k == u16::from(key::SAFETY_STATUS) => {
            if let Value::Uint(code) = value {
                report.safety_status = Some(SafetyStatus::from_code(code.min(255) as u8));
            }
        }
        // Unknown keys are decoded for framing but otherwise ignored.
        _ => {}
    }
}
