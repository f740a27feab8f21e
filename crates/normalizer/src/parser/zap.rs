//! OWASP ZAP: JSON 리포트 (`site` 객체 또는 배열)

use serde_json::Value;

use super::{BackendParser, ParseOutcome, parse_document, str_field};
use crate::error::NormalizerError;
use crate::severity;

/// OWASP ZAP 출력 파서
///
/// 심각도는 `riskdesc`("High (Medium)")의 첫 단어로 정합니다.
#[derive(Debug, Default)]
pub struct ZapParser;

impl BackendParser for ZapParser {
    fn prefix(&self) -> &str {
        "zap"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        let document = parse_document(self.prefix(), input)?;
        let sites = match document.get("site") {
            Some(Value::Array(sites)) => sites.iter().collect::<Vec<_>>(),
            Some(site @ Value::Object(_)) => vec![site],
            Some(_) => return Err(NormalizerError::parse(self.prefix(), "invalid 'site' field")),
            None => Vec::new(),
        };

        let mut outcome = ParseOutcome::default();
        for site in sites {
            let Some(alerts) = site.get("alerts").and_then(Value::as_array) else {
                continue;
            };
            for alert in alerts {
                let Some(title) = str_field(alert, "name").or_else(|| str_field(alert, "alert"))
                else {
                    outcome.skip();
                    continue;
                };
                let risk = str_field(alert, "riskdesc")
                    .and_then(|r| r.split_whitespace().next())
                    .unwrap_or("");
                let description = str_field(alert, "desc")
                    .map(strip_paragraphs)
                    .unwrap_or_else(|| "No description provided.".to_owned());
                outcome.push(title, severity::ZAP.lookup(risk), description);
            }
        }
        Ok(outcome)
    }
}

/// ZAP 설명의 `<p>` 태그를 제거합니다.
fn strip_paragraphs(desc: &str) -> String {
    desc.replace("</p><p>", "\n")
        .replace("<p>", "")
        .replace("</p>", "")
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use pentaflow_core::types::Severity;

    use super::*;

    #[test]
    fn maps_riskdesc_first_word() {
        let input = r#"{"site":{"@name":"http://example.com","alerts":[
            {"name":"Cross Site Scripting (Reflected)","riskdesc":"High (Medium)","desc":"<p>XSS</p><p>more</p>"},
            {"alert":"Cookie No HttpOnly Flag","riskdesc":"Low (Medium)"},
            {"name":"Timestamp Disclosure","riskdesc":"Informational (Low)"}
        ]}}"#;
        let outcome = ZapParser.parse(input).unwrap();
        let severities: Vec<_> = outcome.drafts.iter().map(|d| d.severity).collect();
        assert_eq!(severities, vec![Severity::High, Severity::Low, Severity::Info]);
        assert_eq!(outcome.drafts[0].description, "XSS\nmore");
        assert_eq!(outcome.drafts[1].description, "No description provided.");
    }

    #[test]
    fn site_array_and_nameless_alert() {
        let input = r#"{"site":[{"alerts":[{"riskdesc":"High"}]},{"alerts":[{"name":"x","riskdesc":"Medium"}]}]}"#;
        let outcome = ZapParser.parse(input).unwrap();
        assert_eq!(outcome.drafts.len(), 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn report_without_site_is_empty() {
        let outcome = ZapParser.parse(r#"{"@version":"2.14.0"}"#).unwrap();
        assert!(outcome.drafts.is_empty());
    }
}
