//! 로컬 프로세스 어댑터
//!
//! 백엔드 도구를 자식 프로세스로 실행하고 표준 출력을 결과로 사용합니다.
//! 출력은 실행 중에도 계속 버퍼에 쌓이므로, 제한 시간 초과 후 `fetch`는 부분 결과를 돌려줍니다.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{BackendAdapter, PollStatus, ScanHandle, TriggerOptions, render_args};
use crate::error::AdapterError;

/// 실패 메시지에 포함할 표준 에러의 최대 길이
const STDERR_TAIL: usize = 512;

#[derive(Debug, Default)]
struct JobOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    /// `None`: 실행 중, `Some(None)`: 시그널로 종료, `Some(Some(code))`: 종료 코드
    exit: Option<Option<i32>>,
}

#[derive(Debug)]
struct Job {
    output: Arc<Mutex<JobOutput>>,
    cancel: CancellationToken,
}

/// 로컬 프로세스 어댑터
///
/// 인자 템플릿의 `{target}`, `{profile}`이 트리거 시 치환됩니다.
#[derive(Debug)]
pub struct ProcessAdapter {
    program: String,
    args: Vec<String>,
    jobs: Mutex<HashMap<String, Job>>,
    next_id: AtomicU64,
}

impl ProcessAdapter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            jobs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    async fn output(&self, handle: &ScanHandle) -> Result<Arc<Mutex<JobOutput>>, AdapterError> {
        let jobs = self.jobs.lock().await;
        jobs.get(handle.as_str())
            .map(|job| Arc::clone(&job.output))
            .ok_or_else(|| AdapterError::UnknownHandle(handle.to_string()))
    }
}

async fn pump<R>(mut reader: R, output: Arc<Mutex<JobOutput>>, stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let mut out = output.lock().await;
                let buf = if stderr { &mut out.stderr } else { &mut out.stdout };
                buf.extend_from_slice(&chunk[..n]);
            }
            Err(e) => {
                debug!(error = %e, "process pipe read failed");
                break;
            }
        }
    }
}

/// 자식과 그 하위 프로세스를 모두 종료합니다.
async fn stop_child(child: &mut Child, program: &str) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            match crate::signal::kill_group(pid, libc::SIGKILL) {
                Ok(()) => {
                    if let Err(e) = child.wait().await {
                        debug!(program, error = %e, "failed to reap backend process");
                    }
                    return;
                }
                Err(e) => debug!(program, error = %e, "process group kill failed"),
            }
        }
    }
    if let Err(e) = child.kill().await {
        warn!(program, error = %e, "failed to kill backend process");
    }
}

impl BackendAdapter for ProcessAdapter {
    async fn trigger(
        &self,
        target: &str,
        options: &TriggerOptions,
    ) -> Result<ScanHandle, AdapterError> {
        let args = render_args(&self.args, target, options);
        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command
            .spawn()
            .map_err(|e| AdapterError::Process(format!("failed to spawn {}: {e}", self.program)))?;

        let output = Arc::new(Mutex::new(JobOutput::default()));
        let cancel = CancellationToken::new();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let task_output = Arc::clone(&output);
        let task_cancel = cancel.clone();
        let program = self.program.clone();
        tokio::spawn(async move {
            let read_stdout = async {
                if let Some(pipe) = stdout {
                    pump(pipe, Arc::clone(&task_output), false).await;
                }
            };
            let read_stderr = async {
                if let Some(pipe) = stderr {
                    pump(pipe, Arc::clone(&task_output), true).await;
                }
            };
            let wait = async {
                tokio::select! {
                    status = child.wait() => status.ok().and_then(|s| s.code()),
                    () = task_cancel.cancelled() => {
                        stop_child(&mut child, &program).await;
                        None
                    }
                }
            };
            let ((), (), code) = tokio::join!(read_stdout, read_stderr, wait);
            task_output.lock().await.exit = Some(code);
        });

        let id = format!(
            "{}-{}",
            self.program,
            self.next_id.fetch_add(1, Ordering::Relaxed)
        );
        self.jobs
            .lock()
            .await
            .insert(id.clone(), Job { output, cancel });
        Ok(ScanHandle(id))
    }

    async fn poll(&self, handle: &ScanHandle) -> Result<PollStatus, AdapterError> {
        let output = self.output(handle).await?;
        let out = output.lock().await;
        Ok(match out.exit {
            None => PollStatus::Pending,
            Some(Some(0)) => PollStatus::Done,
            Some(code) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                let stderr = stderr.trim();
                let start = stderr
                    .char_indices()
                    .rev()
                    .nth(STDERR_TAIL - 1)
                    .map_or(0, |(i, _)| i);
                let tail = &stderr[start..];
                let status = match code {
                    Some(code) => format!("exit code {code}"),
                    None => "terminated by signal".to_owned(),
                };
                if tail.is_empty() {
                    PollStatus::Failed(status)
                } else {
                    PollStatus::Failed(format!("{status}: {tail}"))
                }
            }
        })
    }

    async fn fetch(&self, handle: &ScanHandle) -> Result<Bytes, AdapterError> {
        let output = self.output(handle).await?;
        let out = output.lock().await;
        Ok(Bytes::copy_from_slice(&out.stdout))
    }

    async fn release(&self, handle: &ScanHandle) {
        if let Some(job) = self.jobs.lock().await.remove(handle.as_str()) {
            job.cancel.cancel();
        }
    }
}
