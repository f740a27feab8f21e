//! 세션 터널 관리
//!
//! base64 로 인코딩된 터널 설정을 임시 파일로 풀고, 터널 프로세스를 실행한 뒤
//! 세션 전용 인터페이스가 올라올 때까지 기다립니다.
//!
//! [`TunnelManager::acquire`]는 [`TunnelGuard`]를 반환합니다. 가드는 `release()`로 명시적으로
//! 정리하는 것이 원칙이며, 디스패치 도중 패닉이나 취소로 가드가 버려져도 `Drop`에서
//! 프로세스 종료 신호를 보내고 설정 파일을 지웁니다.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pentaflow_core::config::TunnelConfig;
use pentaflow_core::error::TunnelError;
use pentaflow_core::metrics as m;
use tempfile::NamedTempFile;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// 종료 신호 후 강제 종료까지 기다리는 시간
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// 인터페이스 이름 접두사. `pf` + 8 hex = 10자로 IFNAMSIZ(16) 안에 들어갑니다.
const IFACE_PREFIX: &str = "pf";

/// 인터페이스 상태 확인
pub trait LinkProbe: Send + Sync + 'static {
    /// 인터페이스가 존재하고 주소를 받았는지 확인합니다.
    fn is_up(&self, iface: &str) -> impl Future<Output = bool> + Send;
}

/// `ip addr show dev <iface>`의 종료 코드로 판단하는 기본 구현
#[derive(Debug, Clone, Copy, Default)]
pub struct IpLinkProbe;

impl LinkProbe for IpLinkProbe {
    async fn is_up(&self, iface: &str) -> bool {
        Command::new("ip")
            .args(["addr", "show", "dev", iface])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// 세션별 터널 생성기
#[derive(Debug, Clone)]
pub struct TunnelManager<P> {
    config: TunnelConfig,
    probe: P,
}

impl<P: LinkProbe> TunnelManager<P> {
    pub fn new(config: TunnelConfig, probe: P) -> Self {
        Self { config, probe }
    }

    /// 세션 전용 인터페이스 이름
    ///
    /// 생성된 세션 id (32자 hex) 는 앞 8자를, 그 외 id 는 전체 id 의 해시를 사용합니다.
    /// 접두사가 같은 사용자 지정 id 끼리도 인터페이스를 공유하지 않습니다.
    pub fn interface_name(session_id: &str) -> String {
        let generated = session_id.len() == 32 && session_id.chars().all(|c| c.is_ascii_hexdigit());
        if generated {
            return format!("{IFACE_PREFIX}{}", session_id[..8].to_ascii_lowercase());
        }
        let mut hasher = DefaultHasher::new();
        session_id.hash(&mut hasher);
        format!("{IFACE_PREFIX}{:08x}", hasher.finish() as u32)
    }

    /// 터널을 올리고 가드를 반환합니다.
    ///
    /// 실패하면 이미 실행한 프로세스와 임시 파일을 정리한 뒤 에러를 반환합니다.
    pub async fn acquire(&self, session_id: &str, encoded: &str) -> Result<TunnelGuard, TunnelError> {
        let iface = Self::interface_name(session_id);
        let result = self.bring_up(iface.clone(), encoded).await;
        let outcome = if result.is_ok() { "up" } else { "failed" };
        metrics::counter!(m::TUNNEL_SETUPS_TOTAL, m::LABEL_RESULT => outcome).increment(1);
        match &result {
            Ok(_) => info!(session = %session_id, iface = %iface, "tunnel is up"),
            Err(e) => warn!(session = %session_id, iface = %iface, error = %e, "tunnel setup failed"),
        }
        result
    }

    async fn bring_up(&self, iface: String, encoded: &str) -> Result<TunnelGuard, TunnelError> {
        let decoded = decode(encoded)?;
        let artifact = self.materialize(&decoded)?;
        let path = artifact.path().to_string_lossy().into_owned();

        let mut command = Command::new(&self.config.program);
        command
            .args(self.render_args(&path, &iface))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .map_err(|e| TunnelError::LaunchFailed(format!("{}: {e}", self.config.program)))?;
        debug!(program = %self.config.program, iface = %iface, pid = child.id(), "tunnel process started");

        let mut guard = TunnelGuard {
            iface,
            child: Some(child),
            artifact: Some(artifact),
        };
        match self.wait_up(&mut guard).await {
            Ok(()) => Ok(guard),
            Err(e) => {
                guard.release().await;
                Err(e)
            }
        }
    }

    async fn wait_up(&self, guard: &mut TunnelGuard) -> Result<(), TunnelError> {
        let deadline = Instant::now() + self.config.up_timeout();
        loop {
            if self.probe.is_up(&guard.iface).await {
                return Ok(());
            }
            if let Some(child) = guard.child.as_mut() {
                match child.try_wait() {
                    Ok(Some(status)) => return Err(TunnelError::ProcessExited(status.to_string())),
                    Ok(None) => {}
                    Err(e) => return Err(TunnelError::LaunchFailed(e.to_string())),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(TunnelError::Timeout {
                    iface: guard.iface.clone(),
                    secs: self.config.up_timeout_secs,
                });
            }
            tokio::time::sleep(self.config.poll_interval().min(deadline - now)).await;
        }
    }

    /// 설정 파일을 임시 디렉토리에 씁니다. 파일 권한은 소유자 전용입니다.
    fn materialize(&self, contents: &[u8]) -> Result<NamedTempFile, TunnelError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pentaflow-tunnel-").suffix(".conf");
        let created = if self.config.artifact_dir.is_empty() {
            builder.tempfile()
        } else {
            builder.tempfile_in(&self.config.artifact_dir)
        };
        let mut file = created
            .map_err(|e| TunnelError::LaunchFailed(format!("cannot create tunnel config: {e}")))?;
        file.write_all(contents)
            .and_then(|()| file.flush())
            .map_err(|e| TunnelError::LaunchFailed(format!("cannot write tunnel config: {e}")))?;
        Ok(file)
    }

    fn render_args(&self, config_path: &str, iface: &str) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|arg| arg.replace("{config}", config_path).replace("{iface}", iface))
            .collect()
    }
}

/// base64 터널 설정 디코딩. 줄바꿈이 섞인 입력도 허용합니다.
fn decode(encoded: &str) -> Result<Vec<u8>, TunnelError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(TunnelError::InvalidConfig("empty tunnel config".to_owned()));
    }
    let decoded = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| TunnelError::InvalidConfig(e.to_string()))?;
    if decoded.is_empty() {
        return Err(TunnelError::InvalidConfig("decoded tunnel config is empty".to_owned()));
    }
    Ok(decoded)
}

// ─── TunnelGuard ─────────────────────────────────────────────────────

/// 활성 터널. 버려지면 프로세스를 종료하고 설정 파일을 지웁니다.
#[derive(Debug)]
pub struct TunnelGuard {
    iface: String,
    child: Option<Child>,
    artifact: Option<NamedTempFile>,
}

impl TunnelGuard {
    pub fn interface(&self) -> &str {
        &self.iface
    }

    /// 임시 설정 파일 경로 (정리 전까지 유효)
    pub fn config_path(&self) -> Option<&Path> {
        self.artifact.as_ref().map(NamedTempFile::path)
    }

    /// 터널 프로세스를 종료하고 설정 파일을 지웁니다.
    pub async fn release(mut self) {
        if let Some(mut child) = self.child.take() {
            terminate(&mut child).await;
        }
        if let Some(artifact) = self.artifact.take() {
            if let Err(e) = artifact.close() {
                warn!(iface = %self.iface, error = %e, "failed to remove tunnel config");
            }
        }
        debug!(iface = %self.iface, "tunnel released");
    }
}

impl Drop for TunnelGuard {
    fn drop(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        warn!(iface = %self.iface, "tunnel guard dropped without release, killing process");
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            let _ = crate::signal::kill_group(pid, libc::SIGTERM);
        }
        let _ = child.start_kill();
    }
}

/// 프로세스 그룹에 SIGTERM, 유예 시간 후에도 살아 있으면 강제 종료
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        if let Err(e) = crate::signal::kill_group(pid, libc::SIGTERM) {
            debug!(pid, error = %e, "SIGTERM to tunnel process group failed");
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await.is_ok() {
            return;
        }
    }
    if let Err(e) = child.kill().await {
        debug!(error = %e, "failed to kill tunnel process");
    }
}
