//! 공통 finding 형식: `[{"title", "severity", "description"}]`
//!
//! 전용 파서가 없는 백엔드와 결과 봉투의 `findings` 필드에 사용합니다.

use serde_json::Value;

use super::{BackendParser, ParseOutcome, display_value, json_records, str_field};
use crate::error::NormalizerError;
use crate::severity;

/// 공통 형식 파서 (접두사는 백엔드 이름)
#[derive(Debug, Clone)]
pub struct GenericParser {
    prefix: String,
}

impl GenericParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// 이미 파싱된 finding 배열을 변환합니다.
    pub(crate) fn parse_values(&self, values: &[Value]) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        for value in values {
            match str_field(value, "title").or_else(|| str_field(value, "name")) {
                Some(title) => {
                    let severity =
                        severity::STANDARD.lookup(str_field(value, "severity").unwrap_or(""));
                    let description = value
                        .get("description")
                        .map(display_value)
                        .unwrap_or_default();
                    outcome.push(title, severity, description);
                }
                None => outcome.skip(),
            }
        }
        outcome
    }
}

impl BackendParser for GenericParser {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let (mut records, skipped) = json_records(&self.prefix, input)?;
        // `{"findings": [...]}` 형태도 허용
        if let [single] = records.as_mut_slice() {
            if let Some(Value::Array(items)) = single.get_mut("findings") {
                records = std::mem::take(items);
            }
        }
        let mut outcome = self.parse_values(&records);
        outcome.skipped += skipped;
        Ok(outcome)
    }
}
