//! Arjun: `-oJ` (URL → 파라미터)

use pentaflow_core::types::Severity;
use serde_json::Value;

use super::{BackendParser, ParseOutcome, display_value, parse_document};
use crate::error::NormalizerError;

/// Arjun 숨은 파라미터 탐색 출력 파서
///
/// 값은 파라미터 배열이거나 `{"params": [...]}` 객체입니다.
#[derive(Debug, Default)]
pub struct ArjunParser;

impl BackendParser for ArjunParser {
    fn prefix(&self) -> &str {
        "arj"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let document = parse_document(self.prefix(), input)?;
        let Value::Object(urls) = document else {
            return Err(NormalizerError::parse(self.prefix(), "expected object"));
        };

        let mut outcome = ParseOutcome::default();
        for (url, entry) in &urls {
            let params = match entry {
                Value::Array(_) => entry,
                Value::Object(_) => match entry.get("params") {
                    Some(params @ Value::Array(_)) => params,
                    _ => {
                        outcome.skip();
                        continue;
                    }
                },
                _ => {
                    outcome.skip();
                    continue;
                }
            };
            let names = display_value(params);
            if names.is_empty() {
                continue;
            }
            outcome.push(
                "Hidden parameters",
                Severity::Medium,
                format!("{url}: {names}"),
            );
        }
        Ok(outcome)
    }
}
