//! `pentaflow status` command handler

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;
use tracing::warn;

use pentaflow_core::config::PentaflowConfig;
use pentaflow_core::types::{BackendTask, LogEntry};
use pentaflow_dispatch::TUNNEL_META_KEY;
use pentaflow_session_store::{LoggedProgress, SessionStore, TASK_META_PREFIX, scan_log};

use crate::cli::StatusArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, truncate};
use crate::store::StoreHandle;

const REDACTED: &str = "***REDACTED***";

/// Execute the `status` command.
pub async fn execute(
    args: StatusArgs,
    config: &PentaflowConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let store = StoreHandle::open(&config.store).await?;
    let report = collect(&store, &args.session_id, args.verbose).await?;
    writer.render(&report)?;
    Ok(())
}

/// Build a status report from whatever the store still holds for the session.
pub async fn collect<S: SessionStore>(
    store: &S,
    session_id: &str,
    verbose: bool,
) -> Result<StatusReport, CliError> {
    let meta = store.get_all_meta(session_id).await?;
    let log = store.read_log(session_id).await?;
    if meta.is_empty() && log.is_empty() {
        return Err(CliError::Command(format!(
            "session not found or expired: {session_id}"
        )));
    }
    let results = store.list_results(session_id).await?;
    Ok(StatusReport::build(session_id, meta, log, results, verbose))
}

/// Session metadata, per-backend state and stored result names.
#[derive(Serialize)]
pub struct StatusReport {
    pub session_id: String,
    /// Plain metadata fields, with `task:*` entries removed.
    pub meta: BTreeMap<String, String>,
    /// Structured per-backend state.
    pub tasks: Vec<BackendTask>,
    /// Progress reconstructed from the audit log, used only when no structured state exists.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub progress: BTreeMap<String, LoggedProgress>,
    /// Backends with stored raw output.
    pub results: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<Vec<LogEntry>>,
}

impl StatusReport {
    fn build(
        session_id: &str,
        meta: BTreeMap<String, String>,
        log: Vec<LogEntry>,
        results: Vec<String>,
        verbose: bool,
    ) -> Self {
        let mut fields = BTreeMap::new();
        let mut tasks = Vec::new();
        for (key, value) in meta {
            if let Some(name) = key.strip_prefix(TASK_META_PREFIX) {
                match serde_json::from_str::<BackendTask>(&value) {
                    Ok(task) => tasks.push(task),
                    Err(e) => warn!(backend = %name, error = %e, "unreadable task state"),
                }
            } else if key == TUNNEL_META_KEY {
                fields.insert(key, REDACTED.to_owned());
            } else {
                fields.insert(key, value);
            }
        }
        tasks.sort_by(|a, b| {
            a.priority_tier
                .cmp(&b.priority_tier)
                .then_with(|| a.name.cmp(&b.name))
        });

        let progress = if tasks.is_empty() {
            scan_log(&log)
        } else {
            BTreeMap::new()
        };

        Self {
            session_id: session_id.to_owned(),
            meta: fields,
            tasks,
            progress,
            results,
            log: verbose.then_some(log),
        }
    }
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Session: {}", self.session_id.bold())?;
        for (key, value) in &self.meta {
            let value = if key == "status" {
                match value.as_str() {
                    "completed" => value.green().bold(),
                    "failed" => value.red().bold(),
                    _ => value.yellow(),
                }
            } else {
                value.normal()
            };
            writeln!(w, "  {:<16} {}", format!("{key}:"), value)?;
        }

        writeln!(w)?;
        if !self.tasks.is_empty() {
            writeln!(
                w,
                "{:<18} {:<6} {:<12} {:<10} {:<30}",
                "Backend", "Tier", "Status", "Elapsed", "Detail"
            )?;
            writeln!(w, "{}", "-".repeat(80))?;
            for task in &self.tasks {
                let elapsed = task
                    .elapsed_secs()
                    .map(|s| format!("{s:.1}s"))
                    .unwrap_or_else(|| "-".to_owned());
                writeln!(
                    w,
                    "{:<18} {:<6} {:<12} {:<10} {:<30}",
                    truncate(&task.name, 18),
                    task.priority_tier,
                    task.status.as_str(),
                    elapsed,
                    truncate(task.error_message.as_deref().unwrap_or(""), 30)
                )?;
            }
        } else if !self.progress.is_empty() {
            writeln!(w, "{}", "Progress (from audit log):".dimmed())?;
            for (backend, state) in &self.progress {
                writeln!(w, "  {:<18} {}", backend, state)?;
            }
        } else {
            writeln!(w, "  {}", "No backend activity recorded.".dimmed())?;
        }

        writeln!(w)?;
        if self.results.is_empty() {
            writeln!(w, "Results: {}", "none".dimmed())?;
        } else {
            writeln!(w, "Results: {}", self.results.join(", "))?;
        }

        if let Some(log) = &self.log {
            writeln!(w)?;
            writeln!(w, "{}", "Audit log:".bold())?;
            for entry in log {
                writeln!(w, "  {entry}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pentaflow_core::types::TaskStatus;
    use pentaflow_session_store::MemorySessionStore;
    use std::time::Duration;

    fn store() -> MemorySessionStore {
        MemorySessionStore::new(Duration::from_secs(60))
    }

    async fn put_task(store: &MemorySessionStore, name: &str, tier: u32, status: TaskStatus) {
        let mut task = BackendTask::new(name, tier);
        task.transition(TaskStatus::Triggered).unwrap();
        task.transition(TaskStatus::Polling).unwrap();
        task.finish(status, None).unwrap();
        let key = format!("{TASK_META_PREFIX}{name}");
        store
            .set_meta("s1", &key, &serde_json::to_string(&task).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_collect_unknown_session() {
        let err = collect(&store(), "missing", false)
            .await
            .err()
            .expect("empty session should be reported");
        assert!(err.to_string().contains("session not found or expired"));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_collect_prefers_structured_task_state() {
        let store = store();
        store.set_meta("s1", "status", "completed").await.unwrap();
        put_task(&store, "nuclei", 2, TaskStatus::TimedOut).await;
        put_task(&store, "nmap", 1, TaskStatus::Completed).await;
        store.append_log("s1", "[start] nmap on 203.0.113.7").await.unwrap();
        store
            .put_result("s1", "nmap", Bytes::from_static(b"<nmaprun/>"))
            .await
            .unwrap();

        let report = collect(&store, "s1", false).await.unwrap();
        let names: Vec<_> = report.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["nmap", "nuclei"]);
        assert!(report.progress.is_empty());
        assert!(!report.meta.keys().any(|k| k.starts_with(TASK_META_PREFIX)));
        assert_eq!(report.results, vec!["nmap"]);
        assert!(report.log.is_none());
    }

    #[tokio::test]
    async fn test_collect_falls_back_to_audit_log() {
        let store = store();
        store.append_log("s1", "[start] nmap on 203.0.113.7").await.unwrap();
        store.append_log("s1", "[start] nikto on http://example.com").await.unwrap();
        store
            .append_log("s1", "[done] nmap completed in 4.2s")
            .await
            .unwrap();

        let report = collect(&store, "s1", true).await.unwrap();
        assert!(report.tasks.is_empty());
        assert_eq!(report.progress.get("nmap"), Some(&LoggedProgress::Done));
        assert_eq!(report.progress.get("nikto"), Some(&LoggedProgress::Running));
        assert_eq!(report.log.as_ref().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_collect_redacts_tunnel_config() {
        let store = store();
        store
            .set_meta("s1", TUNNEL_META_KEY, "Y2xpZW50CmRldiB0dW4K")
            .await
            .unwrap();

        let report = collect(&store, "s1", false).await.unwrap();
        assert_eq!(
            report.meta.get(TUNNEL_META_KEY).map(String::as_str),
            Some(REDACTED)
        );
    }

    #[tokio::test]
    async fn test_status_report_render_text() {
        colored::control::set_override(false);
        let store = store();
        store.set_meta("s1", "status", "failed").await.unwrap();
        store
            .set_meta("s1", "failure_reason", "unknown profile: purple")
            .await
            .unwrap();
        store
            .append_log("s1", "session failed: unknown profile: purple")
            .await
            .unwrap();

        let report = collect(&store, "s1", true).await.unwrap();
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Session: s1"));
        assert!(text.contains("unknown profile: purple"));
        assert!(text.contains("No backend activity recorded."));
        assert!(text.contains("Results: none"));
        assert!(text.contains("Audit log:"));
    }
}
