//! Conversation sessions and an in-memory store for them.
//!
//! The store is a cheap-to-clone handle over a shared map, so one store can
//! be handed to every task serving a user. A session is checked out by
//! value, driven through a turn by the runner, and saved back.
//!
//! # Example
//!
//! ```
//! use weather_team::{SessionState, SessionStore};
//!
//! let store = SessionStore::new();
//! let mut session = store.create("session_001", SessionState::new()).unwrap();
//! session.state.last_city_checked = Some("Tokyo".to_string());
//! store.save(&session);
//!
//! let reloaded = store.get("session_001").unwrap();
//! assert_eq!(reloaded.state.last_city_checked.as_deref(), Some("Tokyo"));
//! ```

use crate::content::Content;
use crate::error::{Error, Result};
use crate::state::SessionState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One conversation: its state and the turns so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub state: SessionState,
    pub history: Vec<Content>,
}

impl Session {
    pub fn new(id: impl Into<String>, state: SessionState) -> Self {
        Self {
            id: id.into(),
            state,
            history: Vec::new(),
        }
    }
}

/// Shared in-memory session store.
///
/// Cloning is cheap (Arc-based); clones see the same sessions.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a session with the given initial state.
    pub fn create(&self, id: impl Into<String>, state: SessionState) -> Result<Session> {
        let id = id.into();
        let mut sessions = self.lock();
        if sessions.contains_key(&id) {
            return Err(Error::SessionExists(id));
        }
        let session = Session::new(id.clone(), state);
        sessions.insert(id, session.clone());
        Ok(session)
    }

    /// Get a copy of a stored session.
    pub fn get(&self, id: &str) -> Result<Session> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Store a session, replacing any previous version.
    pub fn save(&self, session: &Session) {
        self.lock().insert(session.id.clone(), session.clone());
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        self.lock().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Ids of all stored sessions.
    pub fn ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}
