//! Fuzz target for SVG overlay decoding.
//!
//! The decoder must skip whatever it cannot read; any input is acceptable.

#![no_main]

use detoverlay::svg::decode_items;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(markup) = std::str::from_utf8(data) {
        let _ = decode_items(markup);
    }
});
