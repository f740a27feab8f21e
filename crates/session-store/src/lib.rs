#![doc = include_str!("../README.md")]

pub mod error;
pub mod memory;
pub mod progress;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod store;

pub use error::SessionStoreError;
pub use memory::MemorySessionStore;
pub use progress::{LogTag, LoggedProgress, scan_log};
#[cfg(feature = "redis")]
pub use redis_store::RedisSessionStore;
pub use store::{SessionKeys, SessionStore, TASK_META_PREFIX};
