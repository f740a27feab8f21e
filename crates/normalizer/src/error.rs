//! 정규화 에러 타입
//!
//! 파서 에러는 정규화기 안에서 Info 레코드로 흡수되며 호출자에게 전파되지 않습니다.
//! 레지스트리 구성 에러만 [`PentaflowError`]로 변환됩니다.

use pentaflow_core::error::{NormalizeError, PentaflowError};

/// 정규화 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum NormalizerError {
    /// 문서 전체 파싱 실패
    #[error("{backend} output could not be parsed: {reason}")]
    Parse {
        /// 파서 접두사
        backend: String,
        /// 실패 사유
        reason: String,
    },

    /// 등록되지 않은 파서 키
    #[error("no parser registered under '{0}'")]
    UnknownParser(String),
}

impl NormalizerError {
    pub(crate) fn parse(backend: &str, reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            backend: backend.to_owned(),
            reason: reason.to_string(),
        }
    }
}

impl From<NormalizerError> for PentaflowError {
    fn from(err: NormalizerError) -> Self {
        match err {
            NormalizerError::Parse { backend, reason } => {
                PentaflowError::Normalize(NormalizeError::Parse { backend, reason })
            }
            NormalizerError::UnknownParser(key) => {
                PentaflowError::Normalize(NormalizeError::UnknownBackend(key))
            }
        }
    }
}
