//! dnsrecon: `-j` (레코드 배열)

use pentaflow_core::types::Severity;
use serde_json::Value;

use super::{BackendParser, ParseOutcome, parse_document, str_field};
use crate::error::NormalizerError;

/// dnsrecon 출력 파서
///
/// 레코드가 하나 이상이면 요약 Info 하나를 만듭니다. `ScanInfo` 헤더 레코드는 세지 않습니다.
#[derive(Debug, Default)]
pub struct DnsreconParser;

impl BackendParser for DnsreconParser {
    fn prefix(&self) -> &str {
        "dns"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let document = parse_document(self.prefix(), input)?;
        let Value::Array(items) = document else {
            return Err(NormalizerError::parse(self.prefix(), "expected array"));
        };

        let records: Vec<&Value> = items
            .iter()
            .filter(|item| str_field(item, "type") != Some("ScanInfo"))
            .collect();

        let mut outcome = ParseOutcome::default();
        if records.is_empty() {
            return Ok(outcome);
        }

        let mut kinds: Vec<&str> = records
            .iter()
            .filter_map(|record| str_field(record, "type"))
            .collect();
        kinds.sort_unstable();
        kinds.dedup();

        let mut description = format!("Found {} records", records.len());
        if !kinds.is_empty() {
            description.push_str(&format!(" ({})", kinds.join(", ")));
        }
        outcome.push("DNS records found", Severity::Info, description);
        Ok(outcome)
    }
}
