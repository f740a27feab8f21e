#![no_main]

use libfuzzer_sys::fuzz_target;
use pentaflow_normalizer::BackendParser;
use pentaflow_normalizer::parser::NmapParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let _ = NmapParser.parse(content);
    }
});
