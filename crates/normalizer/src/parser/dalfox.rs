//! Dalfox: JSON 배열 또는 JSON Lines

use pentaflow_core::types::Severity;
use serde_json::Value;

use super::{BackendParser, ParseOutcome, json_records, str_field};
use crate::error::NormalizerError;

/// Dalfox XSS 스캐너 출력 파서
///
/// 버전마다 키 이름이 달라 대체 키를 순서대로 확인합니다.
#[derive(Debug, Default)]
pub struct DalfoxParser;

fn first_field<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| str_field(record, key))
}

impl BackendParser for DalfoxParser {
    fn prefix(&self) -> &str {
        "dal"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let (records, skipped) = json_records(self.prefix(), input)?;
        let mut outcome = ParseOutcome {
            skipped,
            ..ParseOutcome::default()
        };

        for record in &records {
            if !record.is_object() || record.as_object().is_some_and(|m| m.is_empty()) {
                outcome.skip();
                continue;
            }
            let kind = first_field(record, &["type", "inject_type"]).unwrap_or("reflected");
            let description = format!(
                "Target: {}\nParam: {}\nPayload: {}",
                first_field(record, &["data", "url", "target"]).unwrap_or("N/A"),
                first_field(record, &["param", "parameter"]).unwrap_or("N/A"),
                first_field(record, &["payload", "poc"]).unwrap_or("N/A"),
            );
            outcome.push(format!("XSS: {kind}"), Severity::High, description);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndjson_with_alternate_keys() {
        let input = concat!(
            r#"{"type":"V","data":"http://x/?q=1","param":"q","payload":"<svg>"}"#,
            "\n",
            r#"{"inject_type":"inHTML","url":"http://x/?p=","parameter":"p","poc":"<img>"}"#,
            "\n"
        );
        let outcome = DalfoxParser.parse(input).unwrap();
        assert_eq!(outcome.drafts.len(), 2);
        assert_eq!(outcome.drafts[0].title, "XSS: V");
        assert_eq!(outcome.drafts[1].title, "XSS: inHTML");
        assert_eq!(
            outcome.drafts[1].description,
            "Target: http://x/?p=\nParam: p\nPayload: <img>"
        );
        assert!(outcome.drafts.iter().all(|d| d.severity == Severity::High));
    }

    #[test]
    fn empty_objects_are_skipped() {
        let outcome = DalfoxParser.parse("[{}, 1]").unwrap();
        assert!(outcome.drafts.is_empty());
        assert_eq!(outcome.skipped, 2);
    }
}
