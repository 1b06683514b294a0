//! Process-wide session store
//!
//! Sessions live in a sharded map so unrelated sessions never contend.
//! Each session sits behind its own async mutex; holding a [`SessionHandle`]
//! lock across an upstream call serializes requests for that session only.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::{Conversation, DEFAULT_MAX_TURNS, Role, Turn};

/// Session id used when a client does not supply one
pub const DEFAULT_SESSION_ID: &str = "default";

/// Shared, lockable handle to one session's conversation
pub type SessionHandle = Arc<Mutex<Conversation>>;

/// Conversation history keyed by session id
pub struct ConversationStore {
    sessions: DashMap<String, SessionHandle>,
    max_turns: usize,
}

impl ConversationStore {
    /// Create a store retaining at most `max_turns` turns per session
    #[must_use]
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_turns: max_turns.max(1),
        }
    }

    /// Handle to a session, creating it on first reference
    #[must_use]
    pub fn session(&self, session_id: &str) -> SessionHandle {
        if let Some(existing) = self.sessions.get(session_id) {
            return Arc::clone(existing.value());
        }

        let handle = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "creating session");
                Arc::new(Mutex::new(Conversation::new(self.max_turns)))
            });
        Arc::clone(handle.value())
    }

    /// Snapshot of a session's turns, creating the session if absent
    pub async fn get_history(&self, session_id: &str) -> Vec<Turn> {
        let session = self.session(session_id);
        let conv = session.lock().await;
        conv.turns().to_vec()
    }

    /// Append a turn to a session, trimming the oldest turns beyond the cap
    pub async fn append(&self, session_id: &str, role: Role, content: impl Into<String>) {
        let session = self.session(session_id);
        let mut conv = session.lock().await;
        conv.push(Turn {
            role,
            content: content.into(),
        });
    }

    /// Clear a session's turns; unknown sessions are left untouched
    pub async fn reset(&self, session_id: &str) {
        let Some(session) = self.sessions.get(session_id).map(|s| Arc::clone(s.value())) else {
            return;
        };
        session.lock().await.clear();
        tracing::debug!(session_id, "session reset");
    }

    /// Whether a session has been referenced
    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of known sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[must_use]
    pub const fn max_turns(&self) -> usize {
        self.max_turns
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}
