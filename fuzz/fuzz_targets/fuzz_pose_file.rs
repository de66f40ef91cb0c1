#![no_main]

use libfuzzer_sys::fuzz_target;
use posekit_core::{ImportOptions, PoseFile, PosingCapability, PosingConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(file) = PoseFile::from_json(json) else {
        return;
    };

    // Importing into an empty session must never panic.
    if let Ok(mut posing) = PosingCapability::new(PosingConfig::default()) {
        posing.import_pose(&file, &ImportOptions::default().with_model());
    }

    // Anything that parsed must serialize back.
    let _ = serde_json::to_string(&file);
});
