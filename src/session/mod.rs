//! Session and chat history storage
//!
//! Sessions are addressed by a UUID carried in the `session_id` cookie. Each
//! session owns an ordered history of exchanges; both expire after a fixed
//! period that is refreshed whenever the session is resolved.

pub mod memory;
pub mod redis_store;

pub use memory::InMemorySessionStore;
pub use redis_store::RedisSessionStore;

use crate::router::HistoryEntry;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt session data at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Store of sessions and their chat histories
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return `session_id` if it names a live session, refreshing its expiry;
    /// otherwise create a new session with an empty history
    async fn resolve(&self, session_id: Option<&str>) -> Result<String, SessionError>;

    /// Ordered history of a session; empty for unknown sessions
    async fn history(&self, session_id: &str) -> Result<Vec<HistoryEntry>, SessionError>;

    /// Append one exchange to a session's history
    async fn append(&self, session_id: &str, entry: HistoryEntry) -> Result<(), SessionError>;

    /// Drop histories whose session has expired and return how many were removed
    async fn cleanup_expired(&self) -> Result<usize, SessionError>;
}

pub(crate) fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

pub(crate) fn history_key(session_id: &str) -> String {
    format!("history:{}", session_id)
}

pub(crate) fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
