//! WhatWeb: `--log-json` (배열)

use pentaflow_core::types::Severity;
use serde_json::Value;

use super::{BackendParser, ParseOutcome, json_records, str_field};
use crate::error::NormalizerError;

/// WhatWeb 기술 식별 출력 파서
#[derive(Debug, Default)]
pub struct WhatwebParser;

impl BackendParser for WhatwebParser {
    fn prefix(&self) -> &str {
        "ww"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let (records, skipped) = json_records(self.prefix(), input)?;
        let mut outcome = ParseOutcome {
            skipped,
            ..ParseOutcome::default()
        };

        for record in &records {
            let Some(plugins) = record.get("plugins").and_then(Value::as_object) else {
                outcome.skip();
                continue;
            };
            if plugins.is_empty() {
                continue;
            }
            let names = plugins.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
            let site = str_field(record, "target").unwrap_or("target");
            outcome.push(
                "Technologies detected",
                Severity::Info,
                format!("{site}: {names}"),
            );
        }
        Ok(outcome)
    }
}
