//! 컨테이너 어댑터
//!
//! 백엔드 도구 이미지를 컨테이너로 실행하고 컨테이너 표준 출력을 결과로 사용합니다.
//! Docker API 는 [`ContainerRuntime`] trait 뒤에 숨겨 테스트에서 교체할 수 있습니다.
//!
//! ```text
//! ContainerAdapter ──▶ ContainerRuntime (trait)
//!                        ├── BollardRuntime ──▶ Docker daemon
//!                        └── MockRuntime (tests)
//! ```

use std::future::Future;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::{debug, warn};

use super::{BackendAdapter, PollStatus, ScanHandle, TriggerOptions, render_args};
use crate::error::AdapterError;

/// 컨테이너 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Exited { code: i64 },
}

/// Docker API 추상화
pub trait ContainerRuntime: Send + Sync + 'static {
    /// 컨테이너를 만들고 시작한 뒤 ID 를 반환합니다.
    fn run(
        &self,
        image: &str,
        cmd: Vec<String>,
    ) -> impl Future<Output = Result<String, AdapterError>> + Send;

    fn state(&self, id: &str) -> impl Future<Output = Result<RunState, AdapterError>> + Send;

    /// 지금까지의 표준 출력
    fn stdout(&self, id: &str) -> impl Future<Output = Result<Bytes, AdapterError>> + Send;

    /// 실행 중이어도 강제로 제거합니다.
    fn remove(&self, id: &str) -> impl Future<Output = Result<(), AdapterError>> + Send;
}

/// 컨테이너 백엔드 선언
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    /// 명령 템플릿 (`{target}`, `{profile}` 치환)
    pub args: Vec<String>,
}

/// 컨테이너 어댑터
pub struct ContainerAdapter<C> {
    runtime: Arc<C>,
    spec: ContainerSpec,
}

impl<C: ContainerRuntime> ContainerAdapter<C> {
    pub fn new(runtime: Arc<C>, spec: ContainerSpec) -> Self {
        Self { runtime, spec }
    }
}

impl<C: ContainerRuntime> BackendAdapter for ContainerAdapter<C> {
    async fn trigger(
        &self,
        target: &str,
        options: &TriggerOptions,
    ) -> Result<ScanHandle, AdapterError> {
        let cmd = render_args(&self.spec.args, target, options);
        let id = self.runtime.run(&self.spec.image, cmd).await?;
        debug!(image = %self.spec.image, container_id = %id, "backend container started");
        Ok(ScanHandle(id))
    }

    async fn poll(&self, handle: &ScanHandle) -> Result<PollStatus, AdapterError> {
        Ok(match self.runtime.state(handle.as_str()).await? {
            RunState::Running => PollStatus::Pending,
            RunState::Exited { code: 0 } => PollStatus::Done,
            RunState::Exited { code } => PollStatus::Failed(format!("container exited with code {code}")),
        })
    }

    async fn fetch(&self, handle: &ScanHandle) -> Result<Bytes, AdapterError> {
        self.runtime.stdout(handle.as_str()).await
    }

    async fn release(&self, handle: &ScanHandle) {
        if let Err(e) = self.runtime.remove(handle.as_str()).await {
            warn!(container_id = %handle, error = %e, "failed to remove backend container");
        }
    }
}

// ─── bollard 구현 ───────────────────────────────────────────────────

/// `bollard` 기반 Docker 런타임
pub struct BollardRuntime {
    docker: Arc<bollard::Docker>,
}

impl BollardRuntime {
    /// 플랫폼 기본 소켓으로 연결합니다.
    pub fn connect_local() -> Result<Self, AdapterError> {
        let docker = bollard::Docker::connect_with_local_defaults()
            .map_err(|e| AdapterError::Container(format!("failed to connect to docker: {e}")))?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

impl ContainerRuntime for BollardRuntime {
    async fn run(&self, image: &str, cmd: Vec<String>) -> Result<String, AdapterError> {
        use bollard::container::{Config, CreateContainerOptions, StartContainerOptions};

        let config = Config {
            image: Some(image.to_owned()),
            cmd: if cmd.is_empty() { None } else { Some(cmd) },
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };
        let created = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(|e| AdapterError::Container(format!("create {image} failed: {e}")))?;

        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| AdapterError::Container(format!("start {image} failed: {e}")))?;
        Ok(created.id)
    }

    async fn state(&self, id: &str) -> Result<RunState, AdapterError> {
        let details = self
            .docker
            .inspect_container(id, None)
            .await
            .map_err(|e| AdapterError::Container(format!("inspect failed: {e}")))?;
        let state = details.state.unwrap_or_default();
        if state.running.unwrap_or(false) {
            return Ok(RunState::Running);
        }
        match state.exit_code {
            Some(code) => Ok(RunState::Exited { code }),
            // 아직 시작 전
            None => Ok(RunState::Running),
        }
    }

    async fn stdout(&self, id: &str) -> Result<Bytes, AdapterError> {
        use bollard::container::LogsOptions;

        let options = LogsOptions::<String> {
            stdout: true,
            stderr: false,
            ..Default::default()
        };
        let mut stream = std::pin::pin!(self.docker.logs(id, Some(options)));
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| AdapterError::Container(format!("read logs failed: {e}")))?;
            buf.extend_from_slice(&chunk.into_bytes());
        }
        Ok(buf.freeze())
    }

    async fn remove(&self, id: &str) -> Result<(), AdapterError> {
        use bollard::container::RemoveContainerOptions;

        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| AdapterError::Container(format!("remove failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tokio::sync::Mutex;

    use super::*;

    /// 테스트용 런타임: 실행 시 종료 코드와 출력을 미리 지정합니다.
    #[derive(Default)]
    struct MockRuntime {
        exit: Option<i64>,
        output: &'static [u8],
        runs: Mutex<Vec<(String, Vec<String>)>>,
        removed: Mutex<Vec<String>>,
        live: Mutex<HashMap<String, RunState>>,
    }

    impl ContainerRuntime for MockRuntime {
        async fn run(&self, image: &str, cmd: Vec<String>) -> Result<String, AdapterError> {
            if image.is_empty() {
                return Err(AdapterError::Container("no image".to_owned()));
            }
            let mut runs = self.runs.lock().await;
            runs.push((image.to_owned(), cmd));
            let id = format!("c{}", runs.len());
            let state = match self.exit {
                Some(code) => RunState::Exited { code },
                None => RunState::Running,
            };
            self.live.lock().await.insert(id.clone(), state);
            Ok(id)
        }

        async fn state(&self, id: &str) -> Result<RunState, AdapterError> {
            self.live
                .lock()
                .await
                .get(id)
                .copied()
                .ok_or_else(|| AdapterError::Container(format!("no such container: {id}")))
        }

        async fn stdout(&self, _id: &str) -> Result<Bytes, AdapterError> {
            Ok(Bytes::from_static(self.output))
        }

        async fn remove(&self, id: &str) -> Result<(), AdapterError> {
            self.live.lock().await.remove(id);
            self.removed.lock().await.push(id.to_owned());
            Ok(())
        }
    }

    fn spec() -> ContainerSpec {
        ContainerSpec {
            image: "projectdiscovery/nuclei:latest".to_owned(),
            args: vec!["-u".to_owned(), "{target}".to_owned(), "-jsonl".to_owned()],
        }
    }

    #[tokio::test]
    async fn exit_zero_is_done_and_output_is_fetched() {
        let runtime = Arc::new(MockRuntime {
            exit: Some(0),
            output: b"{\"info\":{}}\n",
            ..Default::default()
        });
        let adapter = ContainerAdapter::new(Arc::clone(&runtime), spec());

        let handle = BackendAdapter::trigger(&adapter, "https://x", &TriggerOptions::new("white"))
            .await
            .unwrap();
        assert_eq!(BackendAdapter::poll(&adapter, &handle).await.unwrap(), PollStatus::Done);
        assert_eq!(
            &BackendAdapter::fetch(&adapter, &handle).await.unwrap()[..],
            b"{\"info\":{}}\n"
        );

        let runs = runtime.runs.lock().await;
        assert_eq!(runs[0].1, vec!["-u", "https://x", "-jsonl"]);
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let runtime = Arc::new(MockRuntime {
            exit: Some(2),
            ..Default::default()
        });
        let adapter = ContainerAdapter::new(runtime, spec());
        let handle = BackendAdapter::trigger(&adapter, "x", &TriggerOptions::new("white"))
            .await
            .unwrap();
        assert_eq!(
            BackendAdapter::poll(&adapter, &handle).await.unwrap(),
            PollStatus::Failed("container exited with code 2".to_owned())
        );
    }

    #[tokio::test]
    async fn release_force_removes_running_container() {
        let runtime = Arc::new(MockRuntime::default());
        let adapter = ContainerAdapter::new(Arc::clone(&runtime), spec());
        let handle = BackendAdapter::trigger(&adapter, "x", &TriggerOptions::new("white"))
            .await
            .unwrap();
        assert_eq!(BackendAdapter::poll(&adapter, &handle).await.unwrap(), PollStatus::Pending);

        BackendAdapter::release(&adapter, &handle).await;
        assert_eq!(*runtime.removed.lock().await, vec![handle.0.clone()]);
        assert!(BackendAdapter::poll(&adapter, &handle).await.is_err());
    }
}
