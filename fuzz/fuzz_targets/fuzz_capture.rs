#![no_main]

use libfuzzer_sys::fuzz_target;
use posekit_core::{FrameCapture, PosingCapability, PosingConfig, RecordingSink};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(capture) = FrameCapture::from_json(json) else {
        return;
    };

    // Arbitrary topology (cycles, dangling parents, duplicates) must build
    // and resolve without panicking.
    if let Ok(mut posing) = PosingCapability::new(PosingConfig::default()) {
        posing.refresh_capture(&capture);
        let mut sink = RecordingSink::new();
        posing.write_back(&mut sink);
    }
});
