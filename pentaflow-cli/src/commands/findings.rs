//! `pentaflow findings` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use pentaflow_core::config::PentaflowConfig;
use pentaflow_core::types::{Finding, Severity};
use pentaflow_normalizer::ResultNormalizer;
use pentaflow_session_store::SessionStore;

use crate::cli::FindingsArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, truncate};
use crate::store::StoreHandle;

/// Execute the `findings` command.
pub async fn execute(
    args: FindingsArgs,
    config: &PentaflowConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let min_severity = Severity::from_str_loose(&args.min_severity).ok_or_else(|| {
        CliError::Command(format!(
            "unknown severity: {} (expected: info, low, medium, high, critical)",
            args.min_severity
        ))
    })?;

    let store = StoreHandle::open(&config.store).await?;
    let backends = store.list_results(&args.session_id).await?;
    if backends.is_empty() && store.get_all_meta(&args.session_id).await?.is_empty() {
        return Err(CliError::Command(format!(
            "session not found or expired: {}",
            args.session_id
        )));
    }

    info!(session = %args.session_id, results = backends.len(), "normalizing stored results");
    let normalizer = ResultNormalizer::from_config(config)?;
    let findings = normalizer
        .normalize_session(&store, &args.session_id)
        .await?;

    let report = FindingsReport::new(args.session_id, min_severity, findings);
    writer.render(&report)?;
    Ok(())
}

/// Normalized findings for one session.
#[derive(Serialize)]
pub struct FindingsReport {
    pub session_id: String,
    pub min_severity: Severity,
    /// Findings before the severity filter was applied.
    pub total: usize,
    pub findings: Vec<Finding>,
}

impl FindingsReport {
    pub fn new(session_id: String, min_severity: Severity, findings: Vec<Finding>) -> Self {
        let total = findings.len();
        let findings = findings
            .into_iter()
            .filter(|f| f.severity >= min_severity)
            .collect();
        Self {
            session_id,
            min_severity,
            total,
            findings,
        }
    }
}

impl Render for FindingsReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Findings: {}", self.session_id.bold())?;
        writeln!(
            w,
            "  Showing {} of {} (min severity: {})",
            self.findings.len(),
            self.total,
            self.min_severity
        )?;
        writeln!(w)?;
        render_findings(w, &self.findings)
    }
}

/// Findings table shared by `findings` and `scan --findings`.
pub(crate) fn render_findings(w: &mut dyn Write, findings: &[Finding]) -> std::io::Result<()> {
    use colored::Colorize;

    if findings.is_empty() {
        writeln!(w, "  {}", "No findings.".dimmed())?;
        return Ok(());
    }

    writeln!(
        w,
        "{:<10} {:<16} {:<14} {:<40}",
        "Severity", "ID", "Backend", "Title"
    )?;
    writeln!(w, "{}", "-".repeat(80))?;
    for finding in findings {
        let severity = format!("{:<10}", finding.severity.to_string());
        let severity = match finding.severity {
            Severity::Critical => severity.red().bold(),
            Severity::High => severity.red(),
            Severity::Medium => severity.yellow(),
            Severity::Low => severity.normal(),
            Severity::Info => severity.dimmed(),
        };
        writeln!(
            w,
            "{} {:<16} {:<14} {:<40}",
            severity,
            truncate(&finding.id, 16),
            truncate(&finding.source_backend, 14),
            truncate(&finding.title, 40)
        )?;
    }

    let mut counts = [0usize; 5];
    for finding in findings {
        counts[finding.severity as usize] += 1;
    }
    writeln!(w)?;
    writeln!(
        w,
        "Total: {} (critical {}, high {}, medium {}, low {}, info {})",
        findings.len(),
        counts[Severity::Critical as usize],
        counts[Severity::High as usize],
        counts[Severity::Medium as usize],
        counts[Severity::Low as usize],
        counts[Severity::Info as usize]
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(id: &str, backend: &str, severity: Severity) -> Finding {
        Finding {
            id: id.to_owned(),
            source_backend: backend.to_owned(),
            title: format!("{backend} issue"),
            severity,
            description: String::new(),
        }
    }

    fn sample() -> Vec<Finding> {
        vec![
            finding("nuclei-1", "nuclei", Severity::Critical),
            finding("nikto-2", "nikto", Severity::Medium),
            finding("whatweb-3", "whatweb", Severity::Info),
        ]
    }

    #[test]
    fn test_report_filters_by_min_severity() {
        let report = FindingsReport::new("s1".to_owned(), Severity::Medium, sample());
        assert_eq!(report.total, 3);
        let ids: Vec<_> = report.findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["nuclei-1", "nikto-2"]);
    }

    #[test]
    fn test_report_render_text_lists_findings_and_counts() {
        colored::control::set_override(false);
        let report = FindingsReport::new("s1".to_owned(), Severity::Info, sample());

        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Showing 3 of 3"));
        assert!(output.contains("nuclei-1"));
        assert!(output.contains("critical 1, high 0, medium 1, low 0, info 1"));
    }

    #[test]
    fn test_render_findings_empty() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        render_findings(&mut buffer, &[]).expect("rendering should succeed");
        assert!(String::from_utf8(buffer).unwrap().contains("No findings."));
    }

    #[test]
    fn test_report_json_serialization() {
        let report = FindingsReport::new("s1".to_owned(), Severity::High, sample());
        let json = serde_json::to_string(&report).expect("JSON serialization should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should parse JSON");

        assert_eq!(parsed["session_id"].as_str(), Some("s1"));
        assert_eq!(parsed["total"].as_u64(), Some(3));
        assert_eq!(parsed["findings"].as_array().map(Vec::len), Some(1));
        assert_eq!(parsed["findings"][0]["severity"].as_str(), Some("Critical"));
    }
}
