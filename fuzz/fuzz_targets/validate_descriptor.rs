#![no_main]

use std::path::Path;

use chrono::{DateTime, Utc};
use hanzo_store::{build_catalog, validate_descriptor, Descriptor, Layout};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(descriptor) = serde_json::from_slice::<Descriptor>(data) else {
        return;
    };

    let _ = validate_descriptor(&descriptor, None);
    let _ = validate_descriptor(&descriptor, Some(Path::new("data/tools/fuzz.json")));
    let _ = build_catalog(vec![descriptor], Layout::Partitioned, DateTime::<Utc>::UNIX_EPOCH);
});
