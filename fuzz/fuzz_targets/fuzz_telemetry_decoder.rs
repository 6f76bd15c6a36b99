//! The decoder ingests radio frames, so it must hold up against arbitrary
//! bytes: no panics, and anything it does return must decode from its own
//! re-encoding.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vivaria::telemetry;

fuzz_target!(|data: &[u8]| {
    let Ok(report) = telemetry::decode(data) else {
        return;
    };

    // Whatever survived decoding must encode and roundtrip losslessly,
    // unless it carries non-finite floats the wire cannot compare.
    let mut buf = [0u8; telemetry::MIN_ENCODE_BUF];
    let len = telemetry::encode(&report, &mut buf).expect("encode of decoded report");
    let again = telemetry::decode(&buf[..len]).expect("re-decode");

    let finite = report.temp_hot.is_finite()
        && report.temp_cool.is_finite()
        && report.humidity.is_finite();
    if finite {
        assert_eq!(again.safety_status, report.safety_status);
        assert_eq!(again.temp_hot.to_bits(), report.temp_hot.to_bits());
    }
});
