//! Process-local session store.
//!
//! Maps a session identifier to its [`ChatSession`]. Entries are created
//! lazily on first access and live until the process exits; nothing is
//! persisted. Each session sits behind its own `tokio::sync::Mutex`, which
//! serializes turns within a session while the immutable index allows
//! concurrent retrieval across sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;

use crate::index::VectorIndex;
use crate::models::ConversationTurn;

/// Conversation-manager state for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No index attached yet; turns are rejected.
    Uninitialized,
    /// Index attached; ready to take a turn.
    Ready,
    /// A turn is in flight.
    Answering,
}

/// Per-session chat state. Owned exclusively by [`SessionState`]; the
/// transcript and index are mutated only through the session's lock.
pub struct ChatSession {
    pub id: String,
    pub transcript: Vec<ConversationTurn>,
    pub index: Option<Arc<VectorIndex>>,
    pub state: EngineState,
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            transcript: Vec::new(),
            index: None,
            state: EngineState::Uninitialized,
            created_at: Utc::now(),
        }
    }

    /// Whether an index has been attached and the engine can take turns.
    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }
}

/// In-memory mapping from session identifier to chat session.
pub struct SessionState {
    sessions: Mutex<HashMap<String, Arc<AsyncMutex<ChatSession>>>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the session for `session_id`, creating it empty on first use.
    pub fn get_or_create(&self, session_id: &str) -> Arc<AsyncMutex<ChatSession>> {
        let mut sessions = self.sessions.lock().unwrap();
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(ChatSession::new(session_id)))),
        )
    }

    /// Attach a freshly built index, replacing any previous one wholesale.
    pub async fn attach_index(&self, session_id: &str, index: VectorIndex) {
        let session = self.get_or_create(session_id);
        let mut session = session.lock().await;
        session.index = Some(Arc::new(index));
        session.state = EngineState::Ready;
    }

    /// Clear the transcript. The attached index, if any, is retained.
    pub async fn reset(&self, session_id: &str) {
        let session = self.get_or_create(session_id);
        let mut session = session.lock().await;
        session.transcript.clear();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
