//! 에러 타입: 도메인별 에러 정의
//!
//! 각 크레이트는 자체 에러 타입을 가지며, `From` 구현으로
//! [`PentaflowError`]의 도메인 카테고리로 변환됩니다.

/// Pentaflow 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum PentaflowError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 대상 해석 에러
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// 세션 저장소 에러
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// 디스패치 에러
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// 터널 에러
    #[error("tunnel error: {0}")]
    Tunnel(#[from] TunnelError),

    /// 정규화 에러
    #[error("normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 대상 해석 에러
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// 스킴과 경로를 제거한 뒤 호스트가 비어 있음
    #[error("target is empty")]
    EmptyTarget,
}

/// 세션 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 저장소에 접근할 수 없음
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// 개별 연산 실패
    #[error("store operation failed: {0}")]
    Operation(String),

    /// 저장값 직렬화/역직렬화 실패
    #[error("store serialization failed: {0}")]
    Serialization(String),
}

/// 디스패치 에러
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// 잘못된 스캔 요청
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// 알 수 없는 프로파일
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    /// 알 수 없는 백엔드
    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    /// 백엔드 어댑터 에러
    #[error("adapter error: {0}")]
    Adapter(String),
}

/// 터널 에러
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    /// 터널 설정이 올바른 base64 가 아님
    #[error("invalid tunnel config: {0}")]
    InvalidConfig(String),

    /// 터널 프로세스 실행 실패
    #[error("tunnel launch failed: {0}")]
    LaunchFailed(String),

    /// 제한 시간 내에 인터페이스가 올라오지 않음
    #[error("tunnel interface {iface} not up after {secs}s")]
    Timeout { iface: String, secs: u64 },

    /// 인터페이스가 올라오기 전에 프로세스가 종료됨
    #[error("tunnel process exited: {0}")]
    ProcessExited(String),
}

/// 정규화 에러
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// 등록되지 않은 파서
    #[error("no parser registered for backend: {0}")]
    UnknownBackend(String),

    /// 결과 문서 전체 파싱 실패
    #[error("failed to parse {backend} output: {reason}")]
    Parse { backend: String, reason: String },
}
