#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod target;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    ConfigError, DispatchError, NormalizeError, PentaflowError, ResolveError, StoreError,
    TunnelError,
};

// 설정
pub use config::{BackendConfig, BackendStyle, PentaflowConfig};

// 대상 해석
pub use target::{DnsResolver, SystemDnsResolver, TargetResolver};

// 도메인 타입
pub use types::{
    AddressingPolicy, BackendTask, Finding, LogEntry, Session, SessionStatus, Severity,
    TargetInfo, TargetKind, TaskStatus,
};
