//! Session store selection from `[store]`
//!
//! `SessionStore` uses `impl Future` returns and is not object safe, so the
//! configured backend is wrapped in an enum that forwards every call.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use pentaflow_core::config::StoreConfig;
use pentaflow_core::types::LogEntry;
use pentaflow_session_store::{
    MemorySessionStore, RedisSessionStore, SessionStore, SessionStoreError,
};
use tracing::debug;

use crate::error::CliError;

/// Store selected by `store.backend`.
///
/// The memory store lives only as long as this process, so `status` and
/// `findings` are useful only with `redis`.
#[derive(Clone)]
pub enum StoreHandle {
    Memory(Arc<MemorySessionStore>),
    Redis(Arc<RedisSessionStore>),
}

impl StoreHandle {
    /// Open the configured store.
    pub async fn open(config: &StoreConfig) -> Result<Self, CliError> {
        debug!(backend = %config.backend, "opening session store");
        match config.backend.as_str() {
            "memory" => Ok(Self::Memory(Arc::new(MemorySessionStore::new(config.ttl())))),
            "redis" => {
                let store = RedisSessionStore::connect(&config.redis_url, config.ttl()).await?;
                Ok(Self::Redis(Arc::new(store)))
            }
            other => Err(CliError::Config(format!(
                "unknown store backend '{other}' (expected: memory, redis)"
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }
}

impl SessionStore for StoreHandle {
    async fn append_log(&self, session_id: &str, message: &str) -> Result<(), SessionStoreError> {
        match self {
            Self::Memory(s) => s.append_log(session_id, message).await,
            Self::Redis(s) => s.append_log(session_id, message).await,
        }
    }

    async fn read_log(&self, session_id: &str) -> Result<Vec<LogEntry>, SessionStoreError> {
        match self {
            Self::Memory(s) => s.read_log(session_id).await,
            Self::Redis(s) => s.read_log(session_id).await,
        }
    }

    async fn set_meta(
        &self,
        session_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), SessionStoreError> {
        match self {
            Self::Memory(s) => s.set_meta(session_id, key, value).await,
            Self::Redis(s) => s.set_meta(session_id, key, value).await,
        }
    }

    async fn get_all_meta(
        &self,
        session_id: &str,
    ) -> Result<BTreeMap<String, String>, SessionStoreError> {
        match self {
            Self::Memory(s) => s.get_all_meta(session_id).await,
            Self::Redis(s) => s.get_all_meta(session_id).await,
        }
    }

    async fn put_result(
        &self,
        session_id: &str,
        backend: &str,
        data: Bytes,
    ) -> Result<(), SessionStoreError> {
        match self {
            Self::Memory(s) => s.put_result(session_id, backend, data).await,
            Self::Redis(s) => s.put_result(session_id, backend, data).await,
        }
    }

    async fn get_result(
        &self,
        session_id: &str,
        backend: &str,
    ) -> Result<Option<Bytes>, SessionStoreError> {
        match self {
            Self::Memory(s) => s.get_result(session_id, backend).await,
            Self::Redis(s) => s.get_result(session_id, backend).await,
        }
    }

    async fn list_results(&self, session_id: &str) -> Result<Vec<String>, SessionStoreError> {
        match self {
            Self::Memory(s) => s.list_results(session_id).await,
            Self::Redis(s) => s.list_results(session_id).await,
        }
    }

    async fn ping(&self) -> Result<(), SessionStoreError> {
        match self {
            Self::Memory(s) => s.ping().await,
            Self::Redis(s) => s.ping().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_store_forwards_calls() {
        let store = StoreHandle::open(&StoreConfig::default())
            .await
            .expect("memory store should open");
        assert_eq!(store.kind(), "memory");

        store.set_meta("s1", "status", "running").await.unwrap();
        store
            .put_result("s1", "nmap", Bytes::from_static(b"<nmaprun/>"))
            .await
            .unwrap();

        let meta = store.get_all_meta("s1").await.unwrap();
        assert_eq!(meta.get("status").map(String::as_str), Some("running"));
        assert_eq!(store.list_results("s1").await.unwrap(), vec!["nmap"]);
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_unknown_backend_is_config_error() {
        let config = StoreConfig {
            backend: "etcd".to_owned(),
            ..StoreConfig::default()
        };
        let err = StoreHandle::open(&config).await.err().expect("etcd is unsupported");
        assert_eq!(err.exit_code(), 2);
    }
}
