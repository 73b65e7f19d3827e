//! Per-session state registry.
//!
//! The map itself sits behind a short-lived `RwLock`; each session has its
//! own async mutex, so jobs for different sessions never contend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;

use greekwatch_core::domain::SessionId;
use greekwatch_core::Session;

pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session, replacing any previous one with the same id.
    pub fn create(&self, session: Session) -> SharedSession {
        let id = session.id.clone();
        let shared = Arc::new(Mutex::new(session));
        let mut map = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        map.insert(id, shared.clone());
        shared
    }

    pub fn get(&self, id: &SessionId) -> Option<SharedSession> {
        let map = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        map.get(id).cloned()
    }

    pub fn remove(&self, id: &SessionId) -> bool {
        let mut map = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        map.remove(id).is_some()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        let map = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<SessionId> = map.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
