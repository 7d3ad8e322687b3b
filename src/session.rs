//! In-memory session store
//!
//! Maps session ids to engine handles. Each session sits behind its own
//! async mutex so at most one request mutates a given game at a time; the
//! map lock is only held for insert, lookup and removal.

use crate::engine::{EngineState, GameEngine, GameOptions};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Opaque session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| SessionError::NotFound(s.to_string()))
    }
}

/// One live game
pub struct Session {
    id: SessionId,
    options: GameOptions,
    created_at: DateTime<Utc>,
    engine: Box<dyn GameEngine>,
    closed: bool,
}

impl Session {
    pub fn new(id: SessionId, options: GameOptions, engine: Box<dyn GameEngine>) -> Self {
        Self {
            id,
            options,
            created_at: Utc::now(),
            engine,
            closed: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn options(&self) -> &GameOptions {
        &self.options
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn engine_mut(&mut self) -> &mut dyn GameEngine {
        self.engine.as_mut()
    }

    pub fn state(&self) -> &EngineState {
        self.engine.state()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Exclusive access to a session for the duration of one request
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Session id to engine mapping, no expiry
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under a fresh id
    pub async fn insert(&self, session: Session) -> SessionId {
        let id = session.id();
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, Arc::new(Mutex::new(session)));
        tracing::debug!(session_id = %id, active = sessions.len(), "Session registered");
        id
    }

    /// Lock a session for exclusive use
    ///
    /// Waits for any in-flight request on the same session. A session removed
    /// while we waited reports `NotFound`.
    pub async fn lock(&self, id: SessionId) -> Result<SessionGuard, SessionError> {
        let entry = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        let guard = entry.lock_owned().await;
        if guard.is_closed() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(guard)
    }

    /// Remove a session whose lock the caller holds
    pub async fn remove(&self, guard: &mut SessionGuard) {
        guard.closed = true;
        let id = guard.id();
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id);
        tracing::debug!(
            session_id = %id,
            language = %guard.options().language,
            age_ms = (Utc::now() - guard.created_at()).num_milliseconds(),
            active = sessions.len(),
            "Session removed"
        );
    }

    #[cfg(test)]
    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
