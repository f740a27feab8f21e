//! nuclei: JSON Lines (`-jsonl`)

use serde_json::Value;

use super::{BackendParser, ParseOutcome, display_value, json_records, str_field};
use crate::error::NormalizerError;
use crate::severity;

/// nuclei 템플릿 엔진 출력 파서
#[derive(Debug, Default)]
pub struct NucleiParser;

impl BackendParser for NucleiParser {
    fn prefix(&self) -> &str {
        "nuc"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let (records, skipped) = json_records(self.prefix(), input)?;
        let mut outcome = ParseOutcome {
            skipped,
            ..ParseOutcome::default()
        };

        for record in &records {
            let Some(info) = record.get("info").filter(|v| v.is_object()) else {
                outcome.skip();
                continue;
            };

            let title = str_field(info, "name").unwrap_or("Unknown vulnerability");
            let severity = severity::STANDARD.lookup(str_field(info, "severity").unwrap_or(""));
            outcome.push(title, severity, describe(record));
        }

        Ok(outcome)
    }
}

fn describe(record: &Value) -> String {
    let mut lines = vec![format!(
        "Template: {}",
        str_field(record, "template-id").unwrap_or("N/A")
    )];
    lines.push(format!(
        "Matcher: {}",
        str_field(record, "matcher-name").unwrap_or("N/A")
    ));
    if let Some(matched) = str_field(record, "matched-at") {
        lines.push(format!("Matched: {matched}"));
    }
    if let Some(extracted) = record.get("extracted-results") {
        let extracted = display_value(extracted);
        if !extracted.is_empty() {
            lines.push(format!("Extracted: {extracted}"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use pentaflow_core::types::Severity;

    use super::*;

    fn line(id: &str, sev: &str) -> String {
        format!(
            r#"{{"template-id":"{id}","info":{{"name":"{id} detected","severity":"{sev}"}},"matched-at":"http://example.com/{id}"}}"#
        )
    }

    #[test]
    fn five_good_lines_one_bad_line() {
        let mut lines: Vec<String> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| line(id, "high"))
            .collect();
        lines.insert(2, "{\"template-id\": \"broken".to_owned());
        let outcome = NucleiParser.parse(&lines.join("\n")).unwrap();
        assert_eq!(outcome.drafts.len(), 5);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn severity_and_description() {
        let outcome = NucleiParser.parse(&line("git-config", "Critical")).unwrap();
        let draft = &outcome.drafts[0];
        assert_eq!(draft.title, "git-config detected");
        assert_eq!(draft.severity, Severity::Critical);
        assert!(draft.description.contains("Template: git-config"));
        assert!(draft.description.contains("Matcher: N/A"));
        assert!(draft.description.contains("Matched: http://example.com/git-config"));
    }

    #[test]
    fn unknown_severity_maps_to_info() {
        let outcome = NucleiParser.parse(&line("x", "unknown")).unwrap();
        assert_eq!(outcome.drafts[0].severity, Severity::Info);
    }

    #[test]
    fn record_without_info_is_skipped() {
        let input = format!("{}\n{{\"template-id\":\"orphan\"}}", line("ok", "low"));
        let outcome = NucleiParser.parse(&input).unwrap();
        assert_eq!(outcome.drafts.len(), 1);
        assert_eq!(outcome.skipped, 1);
    }
}
