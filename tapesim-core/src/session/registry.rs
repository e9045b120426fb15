//! Session registry
//!
//! In-memory `session_id → Session` map. Each session sits behind its own mutex, so every
//! mutating call on one session is serialized while different sessions proceed in
//! parallel. The registry is a plain value: construct one and pass it where it is needed.

use super::controller::Session;
use crate::config::SimConfig;
use crate::core::{SessionId, SimError, SimResult};
use crate::tape::Tape;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Shared handle to one registered session
pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionHandle>,
    config: SimConfig,
}

impl SessionRegistry {
    pub fn new(config: SimConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Load `tape_path` and register a fresh replay session over it
    ///
    /// A malformed tape fails here; no session is registered.
    pub fn create(&self, tape_path: impl AsRef<Path>) -> SimResult<SessionId> {
        let session = Session::load(tape_path, &self.config)?;
        Ok(self.insert(session))
    }

    /// Register a replay session over an already-loaded tape
    pub fn create_from_tape(&self, tape: Tape) -> SimResult<SessionId> {
        let session = Session::from_tape(tape, &self.config)?;
        Ok(self.insert(session))
    }

    /// Register an externally built session (e.g. a live one)
    pub fn insert(&self, session: Session) -> SessionId {
        let id = session.id().clone();
        self.sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        info!(session = %id, active = self.sessions.len(), "Session registered");
        id
    }

    pub fn get(&self, id: &SessionId) -> SimResult<SessionHandle> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SimError::SessionNotFound(id.to_string()))
    }

    /// Run `f` with exclusive access to one session
    pub fn with_session<R>(&self, id: &SessionId, f: impl FnOnce(&mut Session) -> R) -> SimResult<R> {
        let handle = self.get(id)?;
        let mut session = handle.lock();
        Ok(f(&mut session))
    }

    /// Remove a session; unknown ids are ignored. Returns whether something was removed.
    pub fn delete(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            info!(session = %id, "Session deleted");
        }
        removed
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_session() {
        let registry = SessionRegistry::default();
        let id = SessionId::from("sess-missing");
        assert!(matches!(registry.get(&id), Err(SimError::SessionNotFound(_))));
        assert!(!registry.delete(&id));
        assert!(!registry.delete(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_get_delete() {
        let registry = SessionRegistry::default();
        let id = registry
            .create_from_tape(Tape::from_events("mem", Vec::new()))
            .unwrap();
        assert_eq!(registry.len(), 1);
        let done = registry.with_session(&id, |s| s.is_done()).unwrap();
        assert!(done);
        assert_eq!(registry.ids(), vec![id.clone()]);
        assert!(registry.delete(&id));
        assert!(matches!(registry.get(&id), Err(SimError::SessionNotFound(_))));
    }

    #[test]
    fn test_malformed_tape_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"seq\": 1}\n").unwrap();
        let registry = SessionRegistry::default();
        assert!(matches!(registry.create(&path), Err(SimError::TapeFormat { .. })));
        assert!(registry.is_empty());
    }
}
