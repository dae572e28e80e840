//! In-memory registry of live sessions.

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::Session;

/// Concurrent map of live sessions, keyed by session id.
///
/// Purely in-memory: sessions do not survive a restart, and a restarted
/// bridge simply re-authenticates connections as they return. Shared
/// across connection tasks behind an `Arc`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Session>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a freshly authenticated session.
    pub fn register(&self, session: Session) -> Uuid {
        let session_id = session.session_id;
        info!(
            session_id = %session_id,
            local_identity = %session.local_identity,
            method = %session.auth_method,
            "Session registered"
        );
        self.sessions.insert(session_id, session);
        session_id
    }

    /// Mark activity on a session, refreshing `last_activity_at`.
    ///
    /// Returns `false` if the session is unknown (already removed).
    pub fn touch(&self, session_id: &Uuid) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut session) => {
                session.last_activity_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Remove a session when its connection closes.
    pub fn remove(&self, session_id: &Uuid) -> Option<Session> {
        let removed = self.sessions.remove(session_id).map(|(_, session)| session);
        if let Some(session) = &removed {
            info!(
                session_id = %session_id,
                local_identity = %session.local_identity,
                "Session removed"
            );
        }
        removed
    }

    /// Snapshot of a session by id.
    pub fn get(&self, session_id: &Uuid) -> Option<Session> {
        self.sessions.get(session_id).map(|entry| entry.clone())
    }

    /// Local identities with at least one live session.
    pub fn local_identities(&self) -> Vec<String> {
        let mut identities: Vec<String> = self
            .sessions
            .iter()
            .map(|entry| entry.local_identity.clone())
            .collect();
        identities.sort();
        identities.dedup();
        identities
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
