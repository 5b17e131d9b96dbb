//! In-memory session store.
//!
//! Each session owns a bounded, chronological queue of turns. The store maps
//! session keys to individually locked sessions, so operations on one key are
//! serialized while different sessions proceed independently.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use supportline_core::message::Role;
use tokio::sync::{Mutex, RwLock};

/// One utterance in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A fixed-capacity FIFO of turns. Pushing into a full history evicts the oldest.
#[derive(Debug, Clone)]
pub struct BoundedHistory {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl BoundedHistory {
    /// A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a turn, returning the evicted one if the history was full.
    pub fn push(&mut self, turn: Turn) -> Option<Turn> {
        let evicted = if self.turns.len() == self.capacity {
            self.turns.pop_front()
        } else {
            None
        };
        self.turns.push_back(turn);
        evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// A conversation keyed by session id, owned by one organization.
#[derive(Debug)]
pub struct Session {
    session_id: String,
    organization_id: String,
    history: BoundedHistory,
}

impl Session {
    pub fn new(
        session_id: impl Into<String>,
        organization_id: impl Into<String>,
        capacity: usize,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            organization_id: organization_id.into(),
            history: BoundedHistory::new(capacity),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn append_turn(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(Turn::new(role, content));
    }

    /// Turns oldest first.
    pub fn history(&self) -> Vec<Turn> {
        self.history.to_vec()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

/// Shared handle to one session; lock it for the duration of a chat turn.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Registry of live sessions. Nothing expires; sessions leave only via [`SessionStore::delete`].
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &supportline_config::ChatConfig) -> Self {
        Self::new(config.history_capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the session for `session_id`, creating an empty one if absent.
    ///
    /// The organization of an existing session is left as it was.
    pub async fn get_or_create(&self, session_id: &str, organization_id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::debug!(session_id, organization_id, "Session created");
            Arc::new(Mutex::new(Session::new(
                session_id,
                organization_id,
                self.capacity,
            )))
        }))
    }

    /// Look up a session without creating it.
    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Empty a session's history, keeping the session. Returns whether it existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        let Some(handle) = self.get(session_id).await else {
            return false;
        };
        handle.lock().await.clear_history();
        true
    }

    /// Remove a session entirely. Returns whether it existed.
    pub async fn delete(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(10)
    }
}
