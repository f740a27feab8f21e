//! SSLyze: `--json_out`

use pentaflow_core::types::Severity;
use serde_json::Value;

use super::{BackendParser, ParseOutcome};
use crate::error::NormalizerError;

const VULNERABLE_PREFIX: &str = "is_vulnerable_to_";

/// SSLyze 출력 파서
///
/// 완료 사실을 Info 로 남기고, 문서 어디든 `is_vulnerable_to_*: true`가 있으면
/// 취약점마다 Medium finding 을 추가합니다. JSON 이 아닌 출력도 완료 레코드는 남깁니다.
#[derive(Debug, Default)]
pub struct SslyzeParser;

impl BackendParser for SslyzeParser {
    fn prefix(&self) -> &str {
        "ssl"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let mut outcome = ParseOutcome::default();
        outcome.push(
            "SSLyze completed",
            Severity::Info,
            "TLS configuration scan finished",
        );

        let Ok(document) = serde_json::from_str::<Value>(input) else {
            return Ok(outcome);
        };

        let mut flags = Vec::new();
        collect_vulnerable(&document, &mut flags);
        flags.sort();
        flags.dedup();
        for flag in flags {
            let name = flag.trim_start_matches(VULNERABLE_PREFIX).replace('_', " ");
            outcome.push(
                format!("TLS vulnerable to {name}"),
                Severity::Medium,
                format!("SSLyze reported {flag} = true"),
            );
        }
        Ok(outcome)
    }
}

fn collect_vulnerable(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key.starts_with(VULNERABLE_PREFIX) && child.as_bool() == Some(true) {
                    out.push(key.clone());
                }
                collect_vulnerable(child, out);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_vulnerable(item, out)),
        _ => {}
    }
}
