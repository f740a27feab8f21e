#![no_main]

use libfuzzer_sys::fuzz_target;
use pentaflow_core::target::split_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        if let Ok(target) = split_target(raw) {
            assert!(!target.host.is_empty());
        }
    }
});
