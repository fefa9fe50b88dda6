//! Fuzz target for detection payload parsing.
//!
//! Arbitrary bytes go through the payload reader and normalizer; malformed
//! items must be dropped, never panic.

#![no_main]

use detoverlay::ir::io_payload::from_payload_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_payload_slice(data, 1920, 1080);
});
