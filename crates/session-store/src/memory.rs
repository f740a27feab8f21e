//! 인메모리 세션 저장소
//!
//! 세션별 데이터를 하나의 맵에 보관하며, 만료 시각은 `tokio::time::Instant`로 계산합니다.
//! 테스트에서는 `tokio::time::pause()`/`advance()`로 TTL 경과를 재현할 수 있습니다.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use bytes::Bytes;
use pentaflow_core::types::LogEntry;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::SessionStoreError;
use crate::store::SessionStore;

#[derive(Debug)]
struct SessionData {
    logs: Vec<LogEntry>,
    meta: BTreeMap<String, String>,
    results: BTreeMap<String, Bytes>,
    expires_at: Instant,
}

impl SessionData {
    fn new(expires_at: Instant) -> Self {
        Self {
            logs: Vec::new(),
            meta: BTreeMap::new(),
            results: BTreeMap::new(),
            expires_at,
        }
    }
}

/// 단일 프로세스용 세션 저장소
#[derive(Debug)]
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, SessionData>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// 만료된 세션을 제거하고 제거된 수를 반환합니다.
    ///
    /// 쓰기마다 자동으로 실행되므로 직접 호출할 필요는 없습니다.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        purge(&mut sessions, Instant::now())
    }

    /// 쓰기 경로: 만료된 세션을 정리하고 TTL을 갱신한 뒤 `f`를 적용합니다.
    async fn write<F>(&self, session_id: &str, f: F)
    where
        F: FnOnce(&mut SessionData),
    {
        let now = Instant::now();
        let expires_at = now + self.ttl;
        let mut sessions = self.sessions.lock().await;
        purge(&mut sessions, now);
        let data = sessions
            .entry(session_id.to_owned())
            .or_insert_with(|| SessionData::new(expires_at));
        data.expires_at = expires_at;
        f(data);
    }

    /// 읽기 경로: 만료되었거나 없는 세션은 `None`으로 취급합니다.
    async fn read<T, F>(&self, session_id: &str, f: F) -> Option<T>
    where
        F: FnOnce(&SessionData) -> T,
    {
        let sessions = self.sessions.lock().await;
        sessions
            .get(session_id)
            .filter(|data| data.expires_at > Instant::now())
            .map(f)
    }
}

fn purge(sessions: &mut HashMap<String, SessionData>, now: Instant) -> usize {
    let before = sessions.len();
    sessions.retain(|_, data| data.expires_at > now);
    let purged = before - sessions.len();
    if purged > 0 {
        debug!(purged, "purged expired sessions");
    }
    purged
}

impl SessionStore for MemorySessionStore {
    async fn append_log(&self, session_id: &str, message: &str) -> Result<(), SessionStoreError> {
        let entry = LogEntry::now(message);
        self.write(session_id, |data| data.logs.push(entry)).await;
        Ok(())
    }

    async fn read_log(&self, session_id: &str) -> Result<Vec<LogEntry>, SessionStoreError> {
        Ok(self
            .read(session_id, |data| data.logs.clone())
            .await
            .unwrap_or_default())
    }

    async fn set_meta(
        &self,
        session_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), SessionStoreError> {
        self.write(session_id, |data| {
            data.meta.insert(key.to_owned(), value.to_owned());
        })
        .await;
        Ok(())
    }

    async fn get_all_meta(
        &self,
        session_id: &str,
    ) -> Result<BTreeMap<String, String>, SessionStoreError> {
        Ok(self
            .read(session_id, |data| data.meta.clone())
            .await
            .unwrap_or_default())
    }

    async fn put_result(
        &self,
        session_id: &str,
        backend: &str,
        data: Bytes,
    ) -> Result<(), SessionStoreError> {
        self.write(session_id, |session| {
            session.results.insert(backend.to_owned(), data);
        })
        .await;
        Ok(())
    }

    async fn get_result(
        &self,
        session_id: &str,
        backend: &str,
    ) -> Result<Option<Bytes>, SessionStoreError> {
        Ok(self
            .read(session_id, |data| data.results.get(backend).cloned())
            .await
            .flatten())
    }

    async fn list_results(&self, session_id: &str) -> Result<Vec<String>, SessionStoreError> {
        Ok(self
            .read(session_id, |data| data.results.keys().cloned().collect())
            .await
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), SessionStoreError> {
        Ok(())
    }
}
