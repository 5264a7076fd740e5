//! Redis-backed session store
//!
//! Keys:
//! - `session:{id}`: JSON `{"created_at": <RFC 3339>}`
//! - `history:{id}`: JSON array of history entries
//!
//! Both keys carry the session expiry, which is refreshed on resolve and on
//! append. Appends are read-modify-write and not atomic across concurrent
//! requests of the same session.

use crate::router::HistoryEntry;
use crate::session::{SessionError, SessionStore, history_key, new_session_id, session_key};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};

/// SCAN batch size used by cleanup
const SCAN_COUNT: usize = 100;

#[derive(Debug, Serialize, Deserialize)]
struct SessionMeta {
    created_at: chrono::DateTime<chrono::Utc>,
}

pub struct RedisSessionStore {
    connection_manager: ConnectionManager,
    expiry_seconds: u64,
}

impl RedisSessionStore {
    /// Connect to Redis at `url`
    pub async fn connect(url: &str, expiry_seconds: u64) -> Result<Self, SessionError> {
        let client = redis::Client::open(url)?;
        let connection_manager = client.get_connection_manager().await?;

        tracing::info!(expiry_seconds = expiry_seconds, "Connected to Redis session store");

        Ok(Self {
            connection_manager,
            expiry_seconds,
        })
    }

    fn expiry_i64(&self) -> i64 {
        i64::try_from(self.expiry_seconds).unwrap_or(i64::MAX)
    }

    async fn write_history(
        &self,
        session_id: &str,
        history: &[HistoryEntry],
    ) -> Result<(), SessionError> {
        let key = history_key(session_id);
        let json = serde_json::to_string(history).map_err(|e| SessionError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        let mut conn = self.connection_manager.clone();
        let _: () = conn.set_ex(&key, json, self.expiry_seconds).await?;
        Ok(())
    }
}

/// Decode a stored history value
pub(crate) fn decode_history(key: &str, json: &str) -> Result<Vec<HistoryEntry>, SessionError> {
    serde_json::from_str(json).map_err(|e| SessionError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn resolve(&self, session_id: Option<&str>) -> Result<String, SessionError> {
        let mut conn = self.connection_manager.clone();

        if let Some(id) = session_id {
            let exists: bool = conn.exists(session_key(id)).await?;
            if exists {
                let _: bool = conn.expire(session_key(id), self.expiry_i64()).await?;
                let _: bool = conn.expire(history_key(id), self.expiry_i64()).await?;
                return Ok(id.to_string());
            }
        }

        let id = new_session_id();
        let meta = SessionMeta {
            created_at: chrono::Utc::now(),
        };
        let meta_json = serde_json::to_string(&meta).map_err(|e| SessionError::Corrupt {
            key: session_key(&id),
            reason: e.to_string(),
        })?;

        let _: () = conn
            .set_ex(session_key(&id), meta_json, self.expiry_seconds)
            .await?;
        self.write_history(&id, &[]).await?;

        tracing::debug!(session_id = %id, "Created new session");
        Ok(id)
    }

    async fn history(&self, session_id: &str) -> Result<Vec<HistoryEntry>, SessionError> {
        let key = history_key(session_id);
        let mut conn = self.connection_manager.clone();
        let stored: Option<String> = conn.get(&key).await?;
        match stored {
            Some(json) => decode_history(&key, &json),
            None => Ok(Vec::new()),
        }
    }

    async fn append(&self, session_id: &str, entry: HistoryEntry) -> Result<(), SessionError> {
        let mut history = self.history(session_id).await?;
        history.push(entry);
        self.write_history(session_id, &history).await
    }

    async fn cleanup_expired(&self) -> Result<usize, SessionError> {
        let mut conn = self.connection_manager.clone();
        let mut cursor: u64 = 0;
        let mut cleaned = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg("history:*")
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            for key in keys {
                let Some(id) = key.strip_prefix("history:") else {
                    continue;
                };
                let alive: bool = conn.exists(session_key(id)).await?;
                if !alive {
                    let _: usize = conn.del(&key).await?;
                    cleaned += 1;
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::info!(cleaned_sessions = cleaned, "Session cleanup completed");
        Ok(cleaned)
    }
}
