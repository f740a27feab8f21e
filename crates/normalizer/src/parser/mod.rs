//! 백엔드별 파서: 도구 출력 형식마다 하나씩
//!
//! 각 파서는 [`BackendParser`]를 구현하며 [`ResultNormalizer`](crate::ResultNormalizer)에
//! 백엔드 이름으로 등록됩니다. 파서는 ID를 만들지 않고 [`Draft`]만 반환합니다.
//! ID 부여와 빈 결과/파싱 실패 처리는 정규화기가 일괄로 담당합니다.
//!
//! # 지원 형식
//! - NDJSON: [`NucleiParser`], [`DalfoxParser`] (JSON 배열도 허용)
//! - JSON 배열: [`TestsslParser`], [`WhatwebParser`], [`Wafw00fParser`], [`DnsreconParser`]
//! - JSON 객체: [`ZapParser`], [`WpscanParser`], [`ArjunParser`], [`SslyzeParser`]
//! - 객체 또는 배열: [`NiktoParser`], [`DirsearchParser`]
//! - XML: [`NmapParser`]
//! - 봉투의 일반 finding: [`GenericParser`]

pub mod arjun;
pub mod dalfox;
pub mod dirsearch;
pub mod dnsrecon;
pub mod generic;
pub mod nikto;
pub mod nmap;
pub mod nuclei;
pub mod sslyze;
pub mod testssl;
pub mod wafw00f;
pub mod whatweb;
pub mod wpscan;
pub mod zap;

pub use arjun::ArjunParser;
pub use dalfox::DalfoxParser;
pub use dirsearch::DirsearchParser;
pub use dnsrecon::DnsreconParser;
pub use generic::GenericParser;
pub use nikto::NiktoParser;
pub use nmap::NmapParser;
pub use nuclei::NucleiParser;
pub use sslyze::SslyzeParser;
pub use testssl::TestsslParser;
pub use wafw00f::Wafw00fParser;
pub use whatweb::WhatwebParser;
pub use wpscan::WpscanParser;
pub use zap::ZapParser;

use pentaflow_core::types::Severity;
use serde_json::Value;

use crate::error::NormalizerError;

/// ID가 부여되기 전의 finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub severity: Severity,
    pub description: String,
}

/// 파서 한 번의 결과
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// 정상 레코드에서 만든 finding
    pub drafts: Vec<Draft>,
    /// 건너뛴 잘못된 레코드 수
    pub skipped: usize,
}

impl ParseOutcome {
    pub fn push(
        &mut self,
        title: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) {
        self.drafts.push(Draft {
            title: title.into(),
            severity,
            description: description.into(),
        });
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }
}

/// 백엔드 출력 파서
pub trait BackendParser: Send + Sync {
    /// finding ID 접두사
    fn prefix(&self) -> &str;

    /// 원본 출력을 파싱합니다.
    ///
    /// 개별 레코드 오류는 `skipped`로 집계하고, 문서 전체를 해석할 수 없을 때만 `Err`를 반환합니다.
    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError>;
}

// --- JSON 헬퍼 ---

/// 문서 전체를 하나의 JSON 값으로 파싱합니다.
pub(crate) fn parse_document(prefix: &str, input: &str) -> Result<Value, NormalizerError> {
    serde_json::from_str(input).map_err(|e| NormalizerError::parse(prefix, e))
}

/// JSON 배열, 단일 객체, NDJSON 을 모두 레코드 목록으로 펼칩니다.
///
/// 반환값의 두 번째 요소는 파싱할 수 없었던 NDJSON 줄 수입니다.
/// `[`로 시작하는 입력이 배열로 파싱되지 않으면 문서 전체 실패입니다.
pub(crate) fn json_records(
    prefix: &str,
    input: &str,
) -> Result<(Vec<Value>, usize), NormalizerError> {
    let trimmed = input.trim();
    if trimmed.starts_with('[') {
        return match parse_document(prefix, trimmed)? {
            Value::Array(items) => Ok((items, 0)),
            other => Ok((vec![other], 0)),
        };
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok((vec![value], 0));
    }

    let mut records = Vec::new();
    let mut skipped = 0;
    for line in trimmed.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => records.push(value),
            Err(_) => skipped += 1,
        }
    }
    Ok((records, skipped))
}

/// 문자열 필드
pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// 사람이 읽을 수 있는 값 표현 (문자열은 따옴표 없이, 배열은 쉼표로 연결)
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_records_accepts_array() {
        let (records, skipped) = json_records("t", r#"[{"a":1},{"a":2}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn json_records_accepts_ndjson_and_counts_bad_lines() {
        let input = "{\"a\":1}\n\nnot json\n{\"a\":2}\n";
        let (records, skipped) = json_records("t", input).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn json_records_single_object() {
        let (records, _) = json_records("t", r#"{"a":1}"#).unwrap();
        assert_eq!(records, vec![json!({"a": 1})]);
    }

    #[test]
    fn json_records_broken_array_is_document_error() {
        assert!(json_records("t", "[{\"a\":1},").is_err());
    }

    #[test]
    fn display_value_flattens_arrays() {
        assert_eq!(display_value(&json!(["a", "b", null])), "a, b");
        assert_eq!(display_value(&json!("x")), "x");
        assert_eq!(display_value(&json!(3)), "3");
    }
}
