//! 세션 저장소 에러 타입
//!
//! `From<SessionStoreError> for PentaflowError` 구현으로 `?` 연산자를 통해
//! 상위 에러 타입으로 전파됩니다.

use pentaflow_core::error::{PentaflowError, StoreError};

/// 세션 저장소 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// 저장소 연결 실패
    #[error("connection error: {0}")]
    Connection(String),

    /// 명령 실행 실패
    #[error("command '{command}' failed: {reason}")]
    Command {
        /// 실패한 명령
        command: &'static str,
        /// 실패 사유
        reason: String,
    },

    /// 저장값 직렬화/역직렬화 실패
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<SessionStoreError> for PentaflowError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::Connection(msg) => PentaflowError::Store(StoreError::Unavailable(msg)),
            SessionStoreError::Command { command, reason } => PentaflowError::Store(
                StoreError::Operation(format!("{command}: {reason}")),
            ),
            SessionStoreError::Serialization(msg) => {
                PentaflowError::Store(StoreError::Serialization(msg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_maps_to_unavailable() {
        let err: PentaflowError = SessionStoreError::Connection("refused".to_owned()).into();
        assert!(matches!(
            err,
            PentaflowError::Store(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn command_error_display() {
        let err = SessionStoreError::Command {
            command: "RPUSH",
            reason: "READONLY".to_owned(),
        };
        assert_eq!(err.to_string(), "command 'RPUSH' failed: READONLY");
    }
}
