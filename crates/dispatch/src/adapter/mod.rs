//! 백엔드 어댑터: 호출 방식마다 하나의 구현
//!
//! 모든 백엔드는 `trigger → poll → fetch` 계약으로 다뤄집니다.
//!
//! - [`HttpAdapter`]: `/scan`, `/status/{id}`, `/results/{id}`를 제공하는 스캔 마이크로서비스
//! - [`ProcessAdapter`]: 로컬 실행 파일, 표준 출력이 결과
//! - [`ContainerAdapter`]: 컨테이너 실행, 컨테이너 표준 출력이 결과
//!
//! [`BackendAdapter`]는 RPITIT 를 사용하므로 `dyn`으로 쓸 수 없습니다.
//! 엔진은 blanket 구현으로 자동 제공되는 [`DynBackendAdapter`]를 통해 이질적인 어댑터를 함께 다룹니다.

pub mod container;
pub mod http;
#[cfg(test)]
pub(crate) mod mock;
pub mod process;

pub use container::{BollardRuntime, ContainerAdapter, ContainerRuntime, ContainerSpec, RunState};
pub use http::HttpAdapter;
pub use process::ProcessAdapter;

use std::fmt;
use std::future::Future;

use bytes::Bytes;
use futures::future::BoxFuture;
use serde::Serialize;

use crate::error::AdapterError;

/// 백엔드가 발급한 실행 핸들
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanHandle(pub String);

impl ScanHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 트리거 옵션
///
/// HTTP 백엔드에는 `{"category": <profile>}`로 전달됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerOptions {
    #[serde(rename = "category")]
    pub profile: String,
}

impl TriggerOptions {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
        }
    }
}

/// 폴링 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// 아직 실행 중
    Pending,
    /// 완료, 결과 회수 가능
    Done,
    /// 백엔드가 실패를 보고함
    Failed(String),
}

/// 백엔드 호출 계약
///
/// `poll`이 `Err`를 반환하면 일시적 오류로 간주되어 다음 주기에 재시도됩니다.
/// 종료 상태를 알리려면 `Ok(PollStatus::Failed(..))`를 반환해야 합니다.
pub trait BackendAdapter: Send + Sync + 'static {
    /// 스캔을 시작하고 핸들을 반환합니다.
    fn trigger(
        &self,
        target: &str,
        options: &TriggerOptions,
    ) -> impl Future<Output = Result<ScanHandle, AdapterError>> + Send;

    /// 진행 상태를 확인합니다.
    fn poll(
        &self,
        handle: &ScanHandle,
    ) -> impl Future<Output = Result<PollStatus, AdapterError>> + Send;

    /// 원본 결과를 가져옵니다. 실행 중이면 지금까지의 부분 결과일 수 있습니다.
    fn fetch(&self, handle: &ScanHandle)
    -> impl Future<Output = Result<Bytes, AdapterError>> + Send;

    /// 핸들에 묶인 자원을 정리합니다. 아직 실행 중이면 중단을 시도합니다.
    ///
    /// 엔진은 종료 상태가 된 모든 작업에 대해 한 번 호출합니다. 즉시 중단은 보장되지 않습니다.
    fn release(&self, handle: &ScanHandle) -> impl Future<Output = ()> + Send {
        let _ = handle;
        std::future::ready(())
    }
}

// ─── DynBackendAdapter ───────────────────────────────────────────────

/// dyn-compatible 어댑터 trait
///
/// `Arc<dyn DynBackendAdapter>`로 서로 다른 어댑터를 한 목록에 담을 수 있습니다.
pub trait DynBackendAdapter: Send + Sync {
    fn trigger<'a>(
        &'a self,
        target: &'a str,
        options: &'a TriggerOptions,
    ) -> BoxFuture<'a, Result<ScanHandle, AdapterError>>;

    fn poll<'a>(&'a self, handle: &'a ScanHandle) -> BoxFuture<'a, Result<PollStatus, AdapterError>>;

    fn fetch<'a>(&'a self, handle: &'a ScanHandle) -> BoxFuture<'a, Result<Bytes, AdapterError>>;

    fn release<'a>(&'a self, handle: &'a ScanHandle) -> BoxFuture<'a, ()>;
}

/// BackendAdapter 를 구현한 타입은 자동으로 DynBackendAdapter 도 구현됩니다.
impl<T: BackendAdapter> DynBackendAdapter for T {
    fn trigger<'a>(
        &'a self,
        target: &'a str,
        options: &'a TriggerOptions,
    ) -> BoxFuture<'a, Result<ScanHandle, AdapterError>> {
        Box::pin(BackendAdapter::trigger(self, target, options))
    }

    fn poll<'a>(&'a self, handle: &'a ScanHandle) -> BoxFuture<'a, Result<PollStatus, AdapterError>> {
        Box::pin(BackendAdapter::poll(self, handle))
    }

    fn fetch<'a>(&'a self, handle: &'a ScanHandle) -> BoxFuture<'a, Result<Bytes, AdapterError>> {
        Box::pin(BackendAdapter::fetch(self, handle))
    }

    fn release<'a>(&'a self, handle: &'a ScanHandle) -> BoxFuture<'a, ()> {
        Box::pin(BackendAdapter::release(self, handle))
    }
}

/// 인자 템플릿의 `{target}`, `{profile}`을 치환합니다.
pub(crate) fn render_args(template: &[String], target: &str, options: &TriggerOptions) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            arg.replace("{target}", target)
                .replace("{profile}", &options.profile)
        })
        .collect()
}
