//! wafw00f: `-o out.json` (배열)

use pentaflow_core::types::Severity;
use serde_json::Value;

use super::{BackendParser, ParseOutcome, parse_document, str_field};
use crate::error::NormalizerError;

/// wafw00f WAF 탐지 출력 파서
#[derive(Debug, Default)]
pub struct Wafw00fParser;

impl BackendParser for Wafw00fParser {
    fn prefix(&self) -> &str {
        "waf"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let document = parse_document(self.prefix(), input)?;
        let Value::Array(items) = document else {
            return Err(NormalizerError::parse(self.prefix(), "expected array"));
        };

        let mut outcome = ParseOutcome::default();
        for item in &items {
            if !item.is_object() {
                outcome.skip();
                continue;
            }
            let firewall = str_field(item, "firewall").unwrap_or_default().trim();
            if firewall.is_empty() || firewall.eq_ignore_ascii_case("none") {
                continue;
            }
            let manufacturer = str_field(item, "manufacturer").unwrap_or("unknown vendor");
            let url = str_field(item, "url").unwrap_or("target");
            outcome.push(
                format!("WAF: {firewall}"),
                Severity::Info,
                format!("{url} is protected by {firewall} ({manufacturer})"),
            );
        }
        Ok(outcome)
    }
}
