#![no_main]

use hanzo_store::normalize_homepage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let once = normalize_homepage(input);
        assert_eq!(normalize_homepage(&once), once);
    }
});
