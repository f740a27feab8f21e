//! testssl.sh: `--jsonfile` (배열)

use serde_json::Value;

use super::{BackendParser, ParseOutcome, parse_document, str_field};
use crate::error::NormalizerError;
use crate::severity;

/// testssl.sh 출력 파서
///
/// `OK`/`INFO`/`WARN` 등 표에 없는 심각도는 보고하지 않습니다.
#[derive(Debug, Default)]
pub struct TestsslParser;

impl BackendParser for TestsslParser {
    fn prefix(&self) -> &str {
        "tssl"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let document = parse_document(self.prefix(), input)?;
        let Value::Array(items) = document else {
            return Err(NormalizerError::parse(self.prefix(), "expected array"));
        };

        let mut outcome = ParseOutcome::default();
        for item in &items {
            let (Some(id), Some(raw)) = (str_field(item, "id"), str_field(item, "severity")) else {
                outcome.skip();
                continue;
            };
            let Some(severity) = severity::TESTSSL.get(raw) else {
                continue;
            };
            outcome.push(
                format!("TestSSL: {id}"),
                severity,
                str_field(item, "finding").unwrap_or_default(),
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use pentaflow_core::types::Severity;

    use super::*;

    #[test]
    fn reports_only_mapped_severities() {
        let input = r#"[
            {"id":"SSLv3","severity":"HIGH","finding":"offered"},
            {"id":"TLS1_3","severity":"OK","finding":"offered"},
            {"id":"scanProblem","severity":"FATAL","finding":"no connection"},
            {"id":"BEAST","severity":"LOW","finding":"CBC ciphers"},
            {"finding":"no id"}
        ]"#;
        let outcome = TestsslParser.parse(input).unwrap();
        assert_eq!(outcome.skipped, 1);
        let summary: Vec<_> = outcome
            .drafts
            .iter()
            .map(|d| (d.title.as_str(), d.severity))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("TestSSL: SSLv3", Severity::High),
                ("TestSSL: scanProblem", Severity::Critical),
                ("TestSSL: BEAST", Severity::Low)
            ]
        );
    }

    #[test]
    fn object_is_document_error() {
        assert!(TestsslParser.parse(r#"{"id":"x"}"#).is_err());
    }
}
