//! `pentaflow scan` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use pentaflow_core::config::{BackendStyle, PentaflowConfig};
use pentaflow_core::target::{SystemDnsResolver, TargetResolver};
use pentaflow_core::types::{Finding, SessionStatus};
use pentaflow_dispatch::{
    AdapterFactory, BollardRuntime, IpLinkProbe, ScanRequest, ScanRunner, SessionReport,
    TunnelManager,
};
use pentaflow_normalizer::ResultNormalizer;

use crate::cli::ScanArgs;
use crate::commands::findings::render_findings;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, truncate};
use crate::store::StoreHandle;

/// Execute the `scan` command.
pub async fn execute(
    args: ScanArgs,
    config: PentaflowConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let tunnel_config = match &args.tunnel_config {
        Some(path) => Some(tokio::fs::read_to_string(path).await.map_err(|e| {
            CliError::Command(format!(
                "failed to read tunnel config {}: {}",
                path.display(),
                e
            ))
        })?),
        None => None,
    };

    let store = Arc::new(StoreHandle::open(&config.store).await?);
    let factory = adapter_factory(&config, &args.profile)?;
    let tunnels = TunnelManager::new(config.tunnel.clone(), IpLinkProbe);
    let runner = ScanRunner::new(
        config,
        Arc::clone(&store),
        TargetResolver::new(SystemDnsResolver),
        tunnels,
        factory,
    );

    let mut request = ScanRequest::new(args.target, args.profile);
    if let Some(id) = args.session_id {
        request = request.with_session_id(id);
    }
    if let Some(encoded) = tunnel_config {
        request = request.with_tunnel_config(encoded);
    }

    info!(store = store.kind(), "starting scan");
    let report = runner.run(request).await?;

    let findings = if args.findings && report.session.status == SessionStatus::Completed {
        let normalizer = ResultNormalizer::from_config(runner.config())?;
        Some(
            normalizer
                .normalize_session(store.as_ref(), &report.session.id)
                .await?,
        )
    } else {
        None
    };

    let failure = match report.session.status {
        SessionStatus::Failed => Some(
            report
                .session
                .failure_reason
                .clone()
                .unwrap_or_else(|| "unknown reason".to_owned()),
        ),
        _ => None,
    };

    writer.render(&ScanOutput { report, findings })?;

    match failure {
        Some(reason) => Err(CliError::SessionFailed(reason)),
        None => Ok(()),
    }
}

/// Adapter factory with a Docker runtime attached when the profile needs one.
fn adapter_factory(config: &PentaflowConfig, profile: &str) -> Result<AdapterFactory, CliError> {
    let factory = AdapterFactory::new(&config.dispatch)?;
    let needs_docker = config
        .profile_backends(profile)
        .unwrap_or_default()
        .iter()
        .any(|b| b.style == BackendStyle::Container);
    if !needs_docker {
        return Ok(factory);
    }

    match BollardRuntime::connect_local() {
        Ok(runtime) => Ok(factory.with_container_runtime(Arc::new(runtime))),
        Err(e) => {
            // container backends then fail as misconfigured and the session reports it
            warn!(error = %e, "docker unavailable");
            Ok(factory)
        }
    }
}

/// Session report plus optional normalized findings.
#[derive(Serialize)]
pub struct ScanOutput {
    #[serde(flatten)]
    pub report: SessionReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<Vec<Finding>>,
}

impl Render for ScanOutput {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let session = &self.report.session;
        writeln!(w, "Scan Session: {}", session.id.bold())?;
        writeln!(w, "  Target:  {} ({})", session.target.original, session.target.url)?;
        writeln!(w, "  Profile: {}", session.profile)?;
        let status = match session.status {
            SessionStatus::Completed => "COMPLETED".green().bold(),
            SessionStatus::Failed => "FAILED".red().bold(),
            other => other.as_str().to_uppercase().as_str().yellow(),
        };
        writeln!(w, "  Status:  {}", status)?;
        if let Some(reason) = &session.failure_reason {
            writeln!(w, "  Reason:  {}", reason.red())?;
        }

        if !self.report.tasks.is_empty() {
            writeln!(w)?;
            writeln!(
                w,
                "{:<18} {:<6} {:<12} {:<10} {:<30}",
                "Backend", "Tier", "Status", "Elapsed", "Detail"
            )?;
            writeln!(w, "{}", "-".repeat(80))?;
            for task in &self.report.tasks {
                let status = format!("{:<12}", task.status.as_str());
                let status = if task.status.is_success() {
                    status.green()
                } else {
                    status.red()
                };
                let elapsed = task
                    .elapsed_secs()
                    .map(|s| format!("{s:.1}s"))
                    .unwrap_or_else(|| "-".to_owned());
                writeln!(
                    w,
                    "{:<18} {:<6} {} {:<10} {:<30}",
                    truncate(&task.name, 18),
                    task.priority_tier,
                    status,
                    elapsed,
                    truncate(task.error_message.as_deref().unwrap_or(""), 30)
                )?;
            }

            let tally = &self.report.tally;
            writeln!(w)?;
            writeln!(
                w,
                "Summary: {} completed, {} failed, {} timed out, {} crashed",
                tally.completed, tally.failed, tally.timed_out, tally.crashed
            )?;
        }

        if let Some(findings) = &self.findings {
            writeln!(w)?;
            writeln!(w, "{}", "Findings".bold())?;
            render_findings(w, findings)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pentaflow_core::config::BackendConfig;
    use pentaflow_core::types::{
        AddressingPolicy, BackendTask, Session, Severity, TargetInfo, TargetKind, TaskStatus,
    };

    fn target() -> TargetInfo {
        TargetInfo {
            original: "example.com".to_owned(),
            ip: Some("203.0.113.7".to_owned()),
            fqdn: Some("example.com".to_owned()),
            url: "http://example.com".to_owned(),
            kind: TargetKind::Fqdn,
        }
    }

    fn task(name: &str, tier: u32, status: TaskStatus, msg: Option<&str>) -> BackendTask {
        let mut task = BackendTask::new(name, tier);
        task.transition(TaskStatus::Triggered).unwrap();
        task.transition(TaskStatus::Polling).unwrap();
        task.finish(status, msg.map(str::to_owned)).unwrap();
        task
    }

    fn completed_report() -> SessionReport {
        let mut session = Session::new("s-1", target(), "white");
        session.mark_running();
        session.complete();
        SessionReport::new(
            session,
            vec![
                task("nmap", 1, TaskStatus::Completed, None),
                task("nikto", 1, TaskStatus::Failed, Some("trigger failed: HTTP 500")),
                task("nuclei", 2, TaskStatus::TimedOut, Some("timed out after 600s")),
            ],
        )
    }

    #[test]
    fn test_scan_output_render_text_completed() {
        colored::control::set_override(false);
        let output = ScanOutput {
            report: completed_report(),
            findings: None,
        };

        let mut buffer = Vec::new();
        output
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let text = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(text.contains("Scan Session: s-1"));
        assert!(text.contains("COMPLETED"));
        assert!(text.contains("trigger failed: HTTP 500"));
        assert!(text.contains("Summary: 1 completed, 1 failed, 1 timed out, 0 crashed"));
        assert!(!text.contains("Findings"));
    }

    #[test]
    fn test_scan_output_render_text_failed_session() {
        colored::control::set_override(false);
        let mut session = Session::new("s-2", target(), "white");
        session.fail("tunnel setup failed: tunnel interface pfs2 not up after 30s");
        let output = ScanOutput {
            report: SessionReport::new(session, Vec::new()),
            findings: None,
        };

        let mut buffer = Vec::new();
        output.render_text(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("FAILED"));
        assert!(text.contains("Reason:  tunnel setup failed"));
        assert!(!text.contains("Summary:"));
    }

    #[test]
    fn test_scan_output_json_flattens_report() {
        let output = ScanOutput {
            report: completed_report(),
            findings: Some(vec![Finding {
                id: "nmap-1".to_owned(),
                source_backend: "nmap".to_owned(),
                title: "Open port 22/tcp".to_owned(),
                severity: Severity::Info,
                description: "ssh".to_owned(),
            }]),
        };

        let json = serde_json::to_string(&output).expect("JSON serialization should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should parse JSON");
        assert_eq!(parsed["session"]["id"].as_str(), Some("s-1"));
        assert_eq!(parsed["tasks"].as_array().map(Vec::len), Some(3));
        assert_eq!(parsed["tally"]["timed_out"].as_u64(), Some(1));
        assert_eq!(parsed["findings"][0]["id"].as_str(), Some("nmap-1"));
    }

    #[test]
    fn test_scan_output_json_omits_absent_findings() {
        let output = ScanOutput {
            report: completed_report(),
            findings: None,
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert!(parsed.get("findings").is_none());
    }

    #[test]
    fn test_adapter_factory_without_container_backends() {
        let config = PentaflowConfig::default();
        assert!(adapter_factory(&config, "white").is_ok());
    }

    #[tokio::test]
    async fn test_adapter_factory_tolerates_container_backends() {
        let mut config = PentaflowConfig::default();
        let mut trivy = BackendConfig::http_service("trivy", 1, false, AddressingPolicy::Host);
        trivy.style = BackendStyle::Container;
        trivy.image = Some("aquasec/trivy:latest".to_owned());
        config.backends.push(trivy);
        config
            .profiles
            .insert("containers".to_owned(), vec!["trivy".to_owned()]);
        assert!(adapter_factory(&config, "containers").is_ok());
    }
}
