//! The process-wide table of live sessions.
//!
//! The registry is the only structure touched by more than one session
//! concurrently. `register` performs its duplicate check and insert under a
//! single write-lock acquisition, which is the at-most-one-session-per-
//! identity boundary: two racing starts for the same identity get exactly
//! one success and one `AlreadyActive`.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::SessionError;
use crate::session::SessionHandle;

/// Identity → live session table.
pub struct Registry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    limit: usize,
}

impl Registry {
    /// Create a registry that admits at most `limit` live sessions.
    pub fn new(limit: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limit,
        }
    }

    /// Atomically claim the identity's slot.
    pub async fn register(&self, handle: SessionHandle) -> Result<(), SessionError> {
        let identity = handle.identity().to_string();
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&identity) {
            return Err(SessionError::AlreadyActive(identity));
        }
        if sessions.len() >= self.limit {
            return Err(SessionError::AtCapacity { limit: self.limit });
        }
        debug!(identity = %identity, "Registered session");
        sessions.insert(identity, handle);
        Ok(())
    }

    /// Remove the identity's entry. No-op if absent.
    pub async fn unregister(&self, identity: &str) {
        if self.sessions.write().await.remove(identity).is_some() {
            debug!(identity = %identity, "Unregistered session");
        }
    }

    /// Look up the live session for an identity.
    pub async fn lookup(&self, identity: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(identity).cloned()
    }

    /// Whether a live session exists for this identity.
    pub async fn is_active(&self, identity: &str) -> bool {
        self.sessions.read().await.contains_key(identity)
    }

    /// Point-in-time snapshot of identities with live sessions.
    pub async fn list_active(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
