//! In-process session store
//!
//! Used when no Redis URL is configured. Sessions do not survive a restart
//! and are not shared between processes.

use crate::router::HistoryEntry;
use crate::session::{SessionError, SessionStore, new_session_id};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Creating a session while at least this many are held first drops the
/// expired ones
const SWEEP_THRESHOLD: usize = 256;

#[derive(Debug)]
struct SessionRecord {
    expires_at: Instant,
    history: Vec<HistoryEntry>,
}

#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    expiry: Duration,
}

impl InMemorySessionStore {
    pub fn new(expiry: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            expiry,
        }
    }

    /// Number of sessions currently held, expired or not
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn resolve(&self, session_id: Option<&str>) -> Result<String, SessionError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        if let Some(id) = session_id
            && let Some(record) = sessions.get_mut(id)
            && record.expires_at > now
        {
            record.expires_at = now + self.expiry;
            return Ok(id.to_string());
        }

        if sessions.len() >= SWEEP_THRESHOLD {
            let before = sessions.len();
            sessions.retain(|_, record| record.expires_at > now);
            tracing::debug!(
                evicted_sessions = before - sessions.len(),
                "Swept expired sessions"
            );
        }

        let id = new_session_id();
        sessions.insert(
            id.clone(),
            SessionRecord {
                expires_at: now + self.expiry,
                history: Vec::new(),
            },
        );
        tracing::debug!(session_id = %id, "Created new session");
        Ok(id)
    }

    async fn history(&self, session_id: &str) -> Result<Vec<HistoryEntry>, SessionError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .filter(|r| r.expires_at > Instant::now())
            .map(|r| r.history.clone())
            .unwrap_or_default())
    }

    async fn append(&self, session_id: &str, entry: HistoryEntry) -> Result<(), SessionError> {
        let expires_at = Instant::now() + self.expiry;
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRecord {
                expires_at,
                history: Vec::new(),
            });
        record.history.push(entry);
        record.expires_at = expires_at;
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, SessionError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| record.expires_at > now);
        let cleaned = before - sessions.len();
        if cleaned > 0 {
            tracing::info!(cleaned_sessions = cleaned, "Removed expired sessions");
        }
        Ok(cleaned)
    }
}
