//! 백엔드 디스크립터: 설정 선언을 실행 가능한 어댑터로 바꿉니다.
//!
//! [`AdapterFactory`]는 `[[backends]]`의 `style`에 따라 어댑터를 만들고,
//! 프로파일에 속한 백엔드를 [`BackendDescriptor`] 목록으로 돌려줍니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use pentaflow_core::config::{BackendConfig, BackendStyle, DispatchConfig, PentaflowConfig};
use pentaflow_core::types::AddressingPolicy;

use crate::adapter::{
    ContainerAdapter, ContainerRuntime, ContainerSpec, DynBackendAdapter, HttpAdapter,
    ProcessAdapter,
};
use crate::error::ScanError;

/// 실행할 백엔드 하나
#[derive(Clone)]
pub struct BackendDescriptor {
    pub name: String,
    pub tier: u32,
    pub addressing: AddressingPolicy,
    pub timeout: Duration,
    pub style: BackendStyle,
    pub adapter: Arc<dyn DynBackendAdapter>,
}

impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .field("addressing", &self.addressing)
            .field("timeout", &self.timeout)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

impl BackendDescriptor {
    pub fn new(
        name: impl Into<String>,
        tier: u32,
        addressing: AddressingPolicy,
        timeout: Duration,
        adapter: Arc<dyn DynBackendAdapter>,
    ) -> Self {
        Self {
            name: name.into(),
            tier,
            addressing,
            timeout,
            style: BackendStyle::Http,
            adapter,
        }
    }
}

type ContainerBuilder = Arc<dyn Fn(ContainerSpec) -> Arc<dyn DynBackendAdapter> + Send + Sync>;

/// 설정 → 어댑터 팩토리
#[derive(Clone)]
pub struct AdapterFactory {
    http: reqwest::Client,
    dispatch: DispatchConfig,
    container: Option<ContainerBuilder>,
    pinned: HashMap<String, Arc<dyn DynBackendAdapter>>,
}

impl fmt::Debug for AdapterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pinned: Vec<_> = self.pinned.keys().collect();
        pinned.sort();
        f.debug_struct("AdapterFactory")
            .field("dispatch", &self.dispatch)
            .field("container_runtime", &self.container.is_some())
            .field("pinned", &pinned)
            .finish()
    }
}

impl AdapterFactory {
    /// HTTP 백엔드가 공유할 클라이언트를 만듭니다.
    pub fn new(dispatch: &DispatchConfig) -> Result<Self, ScanError> {
        let http = reqwest::Client::builder()
            .timeout(dispatch.request_timeout())
            .build()
            .map_err(|e| ScanError::misconfigured("http", format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            dispatch: dispatch.clone(),
            container: None,
            pinned: HashMap::new(),
        })
    }

    /// `style = "container"` 백엔드에 사용할 런타임을 지정합니다.
    pub fn with_container_runtime<C: ContainerRuntime>(mut self, runtime: Arc<C>) -> Self {
        self.container = Some(Arc::new(move |spec| {
            Arc::new(ContainerAdapter::new(Arc::clone(&runtime), spec)) as Arc<dyn DynBackendAdapter>
        }));
        self
    }

    /// 특정 백엔드 이름에 이미 만든 어댑터를 고정합니다. 설정의 style 보다 우선합니다.
    pub fn with_adapter(mut self, backend: impl Into<String>, adapter: Arc<dyn DynBackendAdapter>) -> Self {
        self.pinned.insert(backend.into(), adapter);
        self
    }

    /// 백엔드 선언 하나에 대한 어댑터
    pub fn adapter_for(&self, backend: &BackendConfig) -> Result<Arc<dyn DynBackendAdapter>, ScanError> {
        if let Some(adapter) = self.pinned.get(&backend.name) {
            return Ok(Arc::clone(adapter));
        }
        match backend.style {
            BackendStyle::Http => {
                let endpoint = backend
                    .endpoint
                    .as_deref()
                    .ok_or_else(|| ScanError::misconfigured(&backend.name, "http backend needs endpoint"))?;
                Ok(Arc::new(HttpAdapter::with_client(self.http.clone(), endpoint)))
            }
            BackendStyle::Process => {
                let program = backend
                    .program
                    .as_deref()
                    .ok_or_else(|| ScanError::misconfigured(&backend.name, "process backend needs program"))?;
                Ok(Arc::new(ProcessAdapter::new(program, backend.args.clone())))
            }
            BackendStyle::Container => {
                let image = backend
                    .image
                    .clone()
                    .ok_or_else(|| ScanError::misconfigured(&backend.name, "container backend needs image"))?;
                let build = self.container.as_ref().ok_or_else(|| {
                    ScanError::misconfigured(&backend.name, "no container runtime available")
                })?;
                Ok(build(ContainerSpec {
                    image,
                    args: backend.args.clone(),
                }))
            }
        }
    }

    /// 프로파일에 속한 백엔드의 디스크립터 목록 (프로파일 선언 순서)
    pub fn descriptors(
        &self,
        config: &PentaflowConfig,
        profile: &str,
    ) -> Result<Vec<BackendDescriptor>, ScanError> {
        let backends = config
            .profile_backends(profile)
            .ok_or_else(|| ScanError::UnknownProfile(profile.to_owned()))?;

        backends
            .into_iter()
            .map(|backend| {
                Ok(BackendDescriptor {
                    name: backend.name.clone(),
                    tier: backend.tier,
                    addressing: backend.addressing,
                    timeout: backend.timeout(&self.dispatch),
                    style: backend.style,
                    adapter: self.adapter_for(backend)?,
                })
            })
            .collect()
    }

    /// 이 팩토리가 사용할 디스패치 설정
    pub fn dispatch(&self) -> &DispatchConfig {
        &self.dispatch
    }
}
