//! dirsearch: JSON 리포트 (`{"results": [...]}` 또는 배열)

use pentaflow_core::types::Severity;
use serde_json::Value;

use super::{BackendParser, ParseOutcome, parse_document, str_field};
use crate::error::NormalizerError;

/// 발견으로 보고할 HTTP 상태 코드
const REPORTED_STATUS: [u64; 5] = [200, 204, 301, 302, 307];

/// dirsearch 경로 탐색 출력 파서
#[derive(Debug, Default)]
pub struct DirsearchParser;

impl BackendParser for DirsearchParser {
    fn prefix(&self) -> &str {
        "dir"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let document = parse_document(self.prefix(), input)?;
        let entries = match &document {
            Value::Array(entries) => entries.as_slice(),
            Value::Object(_) => document
                .get("results")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            _ => return Err(NormalizerError::parse(self.prefix(), "expected object or array")),
        };

        let mut outcome = ParseOutcome::default();
        for entry in entries {
            let Some(status) = entry.get("status").and_then(Value::as_u64) else {
                outcome.skip();
                continue;
            };
            if !REPORTED_STATUS.contains(&status) {
                continue;
            }
            let url = str_field(entry, "url").unwrap_or("N/A");
            let path = str_field(entry, "path")
                .map(str::to_owned)
                .unwrap_or_else(|| url.to_owned());
            outcome.push(
                format!("Directory: {path}"),
                Severity::Info,
                format!("URL: {url} ({status})"),
            );
        }
        Ok(outcome)
    }
}
