//! services/api/src/adapters/memory.rs
//!
//! The in-memory session store, the concrete implementation of the `SessionStore`
//! port. Sessions live only as long as the process.

use async_trait::async_trait;
use chrono::Utc;
use coursegen_core::domain::Session;
use coursegen_core::ports::{PortError, PortResult, SessionStore, SessionUpdate};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A session table guarded by an async `RwLock`.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, session: Session) -> PortResult<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        if sessions.len() != before {
            debug!("Purged {} expired sessions", before - sessions.len());
        }
        sessions.insert(session.id, session);
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session_id)
            .filter(|s| !s.is_expired(Utc::now()))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn update_session(&self, session_id: Uuid, apply: SessionUpdate) -> PortResult<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .filter(|s| !s.is_expired(Utc::now()))
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;
        apply(session);
        Ok(session.clone())
    }

    async fn delete_session(&self, session_id: Uuid) -> PortResult<()> {
        self.sessions
            .write()
            .await
            .remove(&session_id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }
}
