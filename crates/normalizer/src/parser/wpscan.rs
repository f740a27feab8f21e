//! WPScan: `--format json`

use pentaflow_core::types::Severity;
use serde_json::Value;

use super::{BackendParser, ParseOutcome, parse_document, str_field};
use crate::error::NormalizerError;

/// WPScan 출력 파서
///
/// - `scan_aborted` → Info 하나
/// - `interesting_findings[]` → Info
/// - `version`, `main_theme`, `plugins.*`, `themes.*`의 `vulnerabilities[]` → High
#[derive(Debug, Default)]
pub struct WpscanParser;

impl BackendParser for WpscanParser {
    fn prefix(&self) -> &str {
        "wps"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let document = parse_document(self.prefix(), input)?;
        if !document.is_object() {
            return Err(NormalizerError::parse(self.prefix(), "expected object"));
        }

        let mut outcome = ParseOutcome::default();

        if let Some(reason) = str_field(&document, "scan_aborted") {
            outcome.push("WPScan Aborted", Severity::Info, reason);
            return Ok(outcome);
        }

        if let Some(items) = document.get("interesting_findings").and_then(Value::as_array) {
            for item in items {
                match str_field(item, "to_s") {
                    Some(summary) => {
                        let description = str_field(item, "url").unwrap_or(summary);
                        outcome.push(summary, Severity::Info, description);
                    }
                    None => outcome.skip(),
                }
            }
        }

        let mut components: Vec<(String, &Value)> = Vec::new();
        if let Some(version) = document.get("version").filter(|v| v.is_object()) {
            let number = str_field(version, "number").unwrap_or("unknown");
            components.push((format!("WordPress {number}"), version));
        }
        if let Some(theme) = document.get("main_theme").filter(|v| v.is_object()) {
            let slug = str_field(theme, "slug").unwrap_or("main theme");
            components.push((format!("theme {slug}"), theme));
        }
        for (group, label) in [("plugins", "plugin"), ("themes", "theme")] {
            if let Some(map) = document.get(group).and_then(Value::as_object) {
                for (slug, entry) in map {
                    components.push((format!("{label} {slug}"), entry));
                }
            }
        }

        for (component, entry) in components {
            let Some(vulns) = entry.get("vulnerabilities").and_then(Value::as_array) else {
                continue;
            };
            for vuln in vulns {
                match str_field(vuln, "title") {
                    Some(title) => {
                        let fixed = str_field(vuln, "fixed_in")
                            .map(|v| format!(", fixed in {v}"))
                            .unwrap_or_default();
                        outcome.push(title, Severity::High, format!("Affects {component}{fixed}"));
                    }
                    None => outcome.skip(),
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_scan_is_single_info() {
        let outcome = WpscanParser
            .parse(r#"{"scan_aborted":"The remote website is up, but does not seem to be running WordPress."}"#)
            .unwrap();
        assert_eq!(outcome.drafts.len(), 1);
        assert_eq!(outcome.drafts[0].title, "WPScan Aborted");
        assert_eq!(outcome.drafts[0].severity, Severity::Info);
    }

    #[test]
    fn interesting_findings_and_vulnerabilities() {
        let input = r#"{
            "interesting_findings":[{"to_s":"Headers","url":"http://wp.local/"},{"type":"broken"}],
            "version":{"number":"5.8.1","vulnerabilities":[{"title":"WP < 5.8.2 - SSRF","fixed_in":"5.8.2"}]},
            "main_theme":{"slug":"twentytwentyone","vulnerabilities":[]},
            "plugins":{"akismet":{"vulnerabilities":[{"title":"Akismet XSS"}]}}
        }"#;
        let outcome = WpscanParser.parse(input).unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.drafts.len(), 3);
        assert_eq!(outcome.drafts[1].severity, Severity::High);
        assert_eq!(
            outcome.drafts[1].description,
            "Affects WordPress 5.8.1, fixed in 5.8.2"
        );
        assert_eq!(outcome.drafts[2].description, "Affects plugin akismet");
    }

    #[test]
    fn non_object_is_document_error() {
        assert!(WpscanParser.parse("[]").is_err());
    }
}
