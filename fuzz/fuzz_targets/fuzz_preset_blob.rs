//! Presets are loaded from a flash blob that survives firmware upgrades,
//! so deserialisation plus validation must never panic on stale bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vivaria::config::Preset;

fuzz_target!(|data: &[u8]| {
    let Ok(preset) = postcard::from_bytes::<Preset>(data) else {
        return;
    };
    let _ = preset.validate();
});
