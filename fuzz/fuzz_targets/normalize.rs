#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pentaflow_normalizer::ResultNormalizer;

const BACKENDS: &[&str] = &[
    "nmap", "nuclei", "nikto", "testssl", "sslyze", "zap", "wpscan", "whatweb", "wafw00f",
    "dirsearch", "arjun", "dalfox", "dnsrecon", "unregistered",
];

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    backend: u8,
    /// 원본 결과 (엔벨로프 포함 가능)
    raw: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let backend = BACKENDS[input.backend as usize % BACKENDS.len()];
    let normalizer = ResultNormalizer::with_default_parsers();

    // 어떤 입력이든 패닉 없이 Finding 목록을 반환해야 함
    for finding in normalizer.normalize(backend, Some(input.raw.as_slice())) {
        assert_eq!(finding.source_backend, backend);
    }
});
