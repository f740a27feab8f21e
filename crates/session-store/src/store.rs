//! 세션 저장소 trait 및 키 규칙

use std::collections::BTreeMap;
use std::future::Future;

use bytes::Bytes;
use pentaflow_core::types::LogEntry;

use crate::error::SessionStoreError;

/// 백엔드별 구조화 상태가 저장되는 메타 키 접두사 (`task:<backend>`)
pub const TASK_META_PREFIX: &str = "task:";

/// 세션 단위로 분할된 시간 제한 저장소
///
/// 모든 연산은 세션 ID로 범위가 정해지며, 세션의 모든 키는 하나의 TTL을 공유합니다.
/// 쓰기는 TTL을 갱신하고, 만료된 세션에 대한 읽기는 빈 값/`None`을 반환합니다.
///
/// 각 백엔드는 `(session, backend)`로 분할된 키에만 쓰므로 동시 접근 시
/// read-modify-write 경쟁이 없습니다.
pub trait SessionStore: Send + Sync + 'static {
    /// 감사 로그에 한 줄을 추가합니다.
    fn append_log(
        &self,
        session_id: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), SessionStoreError>> + Send;

    /// 감사 로그 전체를 순서대로 읽습니다.
    fn read_log(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Vec<LogEntry>, SessionStoreError>> + Send;

    /// 메타데이터 값을 설정합니다.
    fn set_meta(
        &self,
        session_id: &str,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), SessionStoreError>> + Send;

    /// 메타데이터 전체를 읽습니다.
    fn get_all_meta(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<BTreeMap<String, String>, SessionStoreError>> + Send;

    /// 백엔드 원본 결과를 저장합니다.
    fn put_result(
        &self,
        session_id: &str,
        backend: &str,
        data: Bytes,
    ) -> impl Future<Output = Result<(), SessionStoreError>> + Send;

    /// 백엔드 원본 결과를 읽습니다.
    fn get_result(
        &self,
        session_id: &str,
        backend: &str,
    ) -> impl Future<Output = Result<Option<Bytes>, SessionStoreError>> + Send;

    /// 결과가 저장된 백엔드 이름 목록 (정렬됨)
    fn list_results(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, SessionStoreError>> + Send;

    /// 저장소 접근 가능 여부를 확인합니다.
    fn ping(&self) -> impl Future<Output = Result<(), SessionStoreError>> + Send;
}

/// 세션 키 이름 규칙
///
/// Redis 구현이 사용하며, 외부 도구와 키 형식을 맞추기 위해 공개합니다.
#[derive(Debug, Clone, Copy)]
pub struct SessionKeys;

impl SessionKeys {
    pub fn logs(session_id: &str) -> String {
        format!("scan:{session_id}:logs")
    }

    pub fn meta(session_id: &str) -> String {
        format!("scan:{session_id}:meta")
    }

    pub fn result(session_id: &str, backend: &str) -> String {
        format!("scan:{session_id}:result:{backend}")
    }

    /// 결과가 저장된 백엔드 이름 집합
    pub fn result_index(session_id: &str) -> String {
        format!("scan:{session_id}:results")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_partitioned_by_session_and_backend() {
        assert_eq!(SessionKeys::logs("abc"), "scan:abc:logs");
        assert_eq!(SessionKeys::meta("abc"), "scan:abc:meta");
        assert_eq!(SessionKeys::result("abc", "nmap"), "scan:abc:result:nmap");
        assert_ne!(
            SessionKeys::result("abc", "nmap"),
            SessionKeys::result("abd", "nmap")
        );
    }
}
