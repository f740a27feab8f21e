//! nikto: `-Format json`, 호스트별 객체 또는 그 배열

use pentaflow_core::types::Severity;
use serde_json::Value;

use super::{BackendParser, ParseOutcome, parse_document, str_field};
use crate::error::NormalizerError;

/// nikto 웹 서버 스캐너 출력 파서
///
/// nikto 는 항목별 심각도를 제공하지 않으므로 모두 Medium 으로 보고합니다.
#[derive(Debug, Default)]
pub struct NiktoParser;

impl BackendParser for NiktoParser {
    fn prefix(&self) -> &str {
        "nikto"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let document = parse_document(self.prefix(), input)?;
        let hosts = match &document {
            Value::Array(hosts) => hosts.iter().collect::<Vec<_>>(),
            Value::Object(_) => vec![&document],
            _ => return Err(NormalizerError::parse(self.prefix(), "expected object or array")),
        };

        let mut outcome = ParseOutcome::default();
        for host in hosts {
            let Some(items) = host.get("vulnerabilities").and_then(Value::as_array) else {
                continue;
            };
            for item in items {
                match str_field(item, "msg") {
                    Some(msg) => {
                        let title = str_field(item, "id")
                            .map(|id| format!("Nikto Finding {id}"))
                            .unwrap_or_else(|| "Nikto Finding".to_owned());
                        let description = match str_field(item, "url") {
                            Some(url) => format!("{msg} ({url})"),
                            None => msg.to_owned(),
                        };
                        outcome.push(title, Severity::Medium, description);
                    }
                    None => outcome.skip(),
                }
            }
        }
        Ok(outcome)
    }
}
