//! 디스패치 에러 타입
//!
//! [`AdapterError`]는 백엔드 하나의 호출 실패이며 엔진이 작업 상태로 흡수합니다.
//! [`ScanError`]는 요청 자체가 잘못된 경우에만 호출자에게 반환됩니다.

use pentaflow_core::error::{ConfigError, DispatchError, PentaflowError, ResolveError};
use pentaflow_session_store::SessionStoreError;

/// 백엔드 어댑터 에러
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// 백엔드가 요청을 거부함 (예: `HTTP 503`)
    #[error("rejected: {0}")]
    Rejected(String),

    /// 전송 실패 (연결, 타임아웃 등)
    #[error("request failed: {0}")]
    Request(String),

    /// 응답 형식이 예상과 다름
    #[error("malformed response: {0}")]
    Malformed(String),

    /// 로컬 프로세스 실행 실패
    #[error("process error: {0}")]
    Process(String),

    /// 컨테이너 런타임 실패
    #[error("container runtime error: {0}")]
    Container(String),

    /// 어댑터가 모르는 핸들
    #[error("unknown handle: {0}")]
    UnknownHandle(String),
}

impl From<AdapterError> for PentaflowError {
    fn from(err: AdapterError) -> Self {
        PentaflowError::Dispatch(DispatchError::Adapter(err.to_string()))
    }
}

/// 스캔 요청 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 요청 필드가 비어 있거나 잘못됨
    #[error("invalid scan request: {0}")]
    InvalidRequest(String),

    /// 대상 문자열을 해석할 수 없음
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// 설정에 없는 프로파일
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    /// 백엔드 선언을 어댑터로 만들 수 없음
    #[error("backend '{backend}' is misconfigured: {reason}")]
    Misconfigured { backend: String, reason: String },

    /// 세션 저장소 에러
    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

impl ScanError {
    pub(crate) fn misconfigured(backend: &str, reason: impl Into<String>) -> Self {
        Self::Misconfigured {
            backend: backend.to_owned(),
            reason: reason.into(),
        }
    }
}

impl From<ScanError> for PentaflowError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::InvalidRequest(msg) => {
                PentaflowError::Dispatch(DispatchError::InvalidRequest(msg))
            }
            ScanError::Resolve(e) => PentaflowError::Resolve(e),
            ScanError::UnknownProfile(name) => {
                PentaflowError::Dispatch(DispatchError::UnknownProfile(name))
            }
            ScanError::Misconfigured { backend, reason } => {
                PentaflowError::Config(ConfigError::InvalidValue {
                    field: format!("backends.{backend}"),
                    reason,
                })
            }
            ScanError::Store(e) => e.into(),
        }
    }
}
