//! Fuzz target for bbox normalization on arbitrary JSON values.

#![no_main]

use detoverlay::ir::normalize;
use detoverlay::ir::normalize::fuzz_reduce_shape;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }

    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let _ = fuzz_reduce_shape(&value);
    for normalized in [false, true] {
        if let Some(rect) = normalize(&value, 640.0, 480.0, normalized) {
            assert!(rect.is_valid());
        }
    }
});
