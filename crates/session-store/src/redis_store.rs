//! Redis 세션 저장소
//!
//! 키 형식:
//! - `scan:{id}:logs`: LIST, [`LogEntry`] JSON
//! - `scan:{id}:meta`: HASH
//! - `scan:{id}:result:{backend}`: STRING (원본 bytes)
//! - `scan:{id}:results`: SET, 결과가 저장된 백엔드 이름
//!
//! 모든 쓰기 뒤에 세션의 모든 키에 같은 EXPIRE를 다시 걸어 하나의 TTL 시계를 공유합니다.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use pentaflow_core::types::LogEntry;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info, warn};

use crate::error::SessionStoreError;
use crate::store::{SessionKeys, SessionStore};

/// Redis 기반 세션 저장소
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    ttl_secs: i64,
}

impl fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("connection", &"ConnectionManager")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

fn command_error(command: &'static str) -> impl FnOnce(redis::RedisError) -> SessionStoreError {
    move |e| SessionStoreError::Command {
        command,
        reason: e.to_string(),
    }
}

impl RedisSessionStore {
    /// Redis에 연결합니다.
    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self, SessionStoreError> {
        info!(url = redis_url, "connecting to redis session store");

        let client = redis::Client::open(redis_url)
            .map_err(|e| SessionStoreError::Connection(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| SessionStoreError::Connection(format!("failed to connect: {e}")))?;

        Ok(Self {
            conn,
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        })
    }

    /// 세션의 모든 키에 TTL을 다시 설정합니다.
    async fn refresh_ttl(&self, session_id: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let index = SessionKeys::result_index(session_id);
        let backends: Vec<String> = conn
            .smembers(&index)
            .await
            .map_err(command_error("SMEMBERS"))?;

        let mut pipe = redis::pipe();
        pipe.expire(SessionKeys::logs(session_id), self.ttl_secs)
            .ignore()
            .expire(SessionKeys::meta(session_id), self.ttl_secs)
            .ignore()
            .expire(&index, self.ttl_secs)
            .ignore();
        for backend in &backends {
            pipe.expire(SessionKeys::result(session_id, backend), self.ttl_secs)
                .ignore();
        }
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(command_error("EXPIRE"))
    }
}

impl SessionStore for RedisSessionStore {
    async fn append_log(&self, session_id: &str, message: &str) -> Result<(), SessionStoreError> {
        let json = serde_json::to_string(&LogEntry::now(message))
            .map_err(|e| SessionStoreError::Serialization(e.to_string()))?;
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(SessionKeys::logs(session_id), json)
            .await
            .map_err(command_error("RPUSH"))?;
        self.refresh_ttl(session_id).await
    }

    async fn read_log(&self, session_id: &str) -> Result<Vec<LogEntry>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn
            .lrange(SessionKeys::logs(session_id), 0, -1)
            .await
            .map_err(command_error("LRANGE"))?;

        Ok(raw
            .into_iter()
            .map(|line| {
                serde_json::from_str::<LogEntry>(&line).unwrap_or_else(|_| {
                    // 다른 도구가 기록한 평문 로그
                    debug!(session_id, "log line is not a json entry");
                    LogEntry::now(line)
                })
            })
            .collect())
    }

    async fn set_meta(
        &self,
        session_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(SessionKeys::meta(session_id), key, value)
            .await
            .map_err(command_error("HSET"))?;
        self.refresh_ttl(session_id).await
    }

    async fn get_all_meta(
        &self,
        session_id: &str,
    ) -> Result<BTreeMap<String, String>, SessionStoreError> {
        let mut conn = self.conn.clone();
        conn.hgetall(SessionKeys::meta(session_id))
            .await
            .map_err(command_error("HGETALL"))
    }

    async fn put_result(
        &self,
        session_id: &str,
        backend: &str,
        data: Bytes,
    ) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .set(SessionKeys::result(session_id, backend), data.as_ref())
            .ignore()
            .sadd(SessionKeys::result_index(session_id), backend)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(command_error("SET"))?;
        self.refresh_ttl(session_id).await
    }

    async fn get_result(
        &self,
        session_id: &str,
        backend: &str,
    ) -> Result<Option<Bytes>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = conn
            .get(SessionKeys::result(session_id, backend))
            .await
            .map_err(command_error("GET"))?;
        Ok(raw.map(Bytes::from))
    }

    async fn list_results(&self, session_id: &str) -> Result<Vec<String>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let backends: BTreeSet<String> = conn
            .smembers(SessionKeys::result_index(session_id))
            .await
            .map_err(command_error("SMEMBERS"))?;
        Ok(backends.into_iter().collect())
    }

    async fn ping(&self) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| {
                warn!(error = %e, "redis ping failed");
                SessionStoreError::Connection(e.to_string())
            })?;
        Ok(())
    }
}
