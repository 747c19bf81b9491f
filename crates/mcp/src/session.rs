//! Session lifecycle state.
//!
//! A session moves through `Uninitialized -> Initialized -> Closed`. Only
//! `initialize` is accepted before the handshake completes, and `Closed` is
//! terminal.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ProtocolError;
use crate::protocol::Implementation;

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initialized,
    Closed,
}

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    protocol_version: Option<String>,
    client_info: Option<Implementation>,
}

/// Handle to one session's state. Clones share the same state.
#[derive(Debug, Clone)]
pub struct Session {
    id: Arc<str>,
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    /// Create an uninitialized session with a fresh random id.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn with_id(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            state: Arc::new(Mutex::new(SessionState {
                phase: SessionPhase::Uninitialized,
                protocol_version: None,
                client_info: None,
            })),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // State updates are single assignments, so a poisoned lock still
        // holds consistent data.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn protocol_version(&self) -> Option<String> {
        self.lock().protocol_version.clone()
    }

    pub fn client_info(&self) -> Option<Implementation> {
        self.lock().client_info.clone()
    }

    /// Complete the handshake, moving `Uninitialized -> Initialized`.
    pub fn initialize(
        &self,
        protocol_version: String,
        client_info: Implementation,
    ) -> Result<(), ProtocolError> {
        let mut state = self.lock();
        match state.phase {
            SessionPhase::Uninitialized => {
                state.phase = SessionPhase::Initialized;
                state.protocol_version = Some(protocol_version);
                state.client_info = Some(client_info);
                Ok(())
            }
            SessionPhase::Initialized => Err(ProtocolError::InvalidRequest(
                "session already initialized".into(),
            )),
            SessionPhase::Closed => Err(ProtocolError::SessionClosed),
        }
    }

    /// Fail unless the session accepts operational calls.
    pub fn ensure_ready(&self) -> Result<(), ProtocolError> {
        match self.phase() {
            SessionPhase::Initialized => Ok(()),
            SessionPhase::Uninitialized => Err(ProtocolError::NotInitialized),
            SessionPhase::Closed => Err(ProtocolError::SessionClosed),
        }
    }

    /// Fail only if the session is closed.
    pub fn ensure_open(&self) -> Result<(), ProtocolError> {
        match self.phase() {
            SessionPhase::Closed => Err(ProtocolError::SessionClosed),
            _ => Ok(()),
        }
    }

    /// Move to the terminal `Closed` phase. Returns false if already closed.
    pub fn close(&self) -> bool {
        let mut state = self.lock();
        let was_open = state.phase != SessionPhase::Closed;
        state.phase = SessionPhase::Closed;
        was_open
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Closed sessions a [`SessionTable`] remembers by default.
pub const DEFAULT_CLOSED_LIMIT: usize = 1024;

#[derive(Debug)]
struct Entries {
    sessions: HashMap<String, Session>,
    /// Ids of closed sessions, oldest first.
    closed: VecDeque<String>,
    closed_limit: usize,
}

/// Shared table of sessions keyed by id.
///
/// Closed sessions stay in the table so that later calls can be told they
/// hit a closed session rather than an unknown one. Only the most recently
/// closed ones are kept; older ids become unknown.
#[derive(Debug, Clone)]
pub struct SessionTable {
    entries: Arc<Mutex<Entries>>,
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::with_closed_limit(DEFAULT_CLOSED_LIMIT)
    }
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table that remembers at most `limit` closed sessions.
    pub fn with_closed_limit(limit: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Entries {
                sessions: HashMap::new(),
                closed: VecDeque::new(),
                closed_limit: limit,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a session. Returns false if the id is already taken.
    pub fn insert(&self, session: Session) -> bool {
        let mut entries = self.lock();
        if entries.sessions.contains_key(session.id()) {
            return false;
        }
        entries.sessions.insert(session.id().to_string(), session);
        true
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.lock().sessions.get(id).cloned()
    }

    /// Close a session by id. Returns false if the id is unknown.
    pub fn close(&self, id: &str) -> bool {
        let mut entries = self.lock();
        let newly_closed = match entries.sessions.get(id) {
            Some(session) => session.close(),
            None => return false,
        };
        if newly_closed {
            entries.closed.push_back(id.to_string());
            while entries.closed.len() > entries.closed_limit {
                if let Some(oldest) = entries.closed.pop_front() {
                    entries.sessions.remove(&oldest);
                }
            }
        }
        true
    }

    /// Number of sessions not yet closed.
    pub fn open_count(&self) -> usize {
        self.lock()
            .sessions
            .values()
            .filter(|s| s.phase() != SessionPhase::Closed)
            .count()
    }

    /// Number of sessions held, open or closed.
    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ProtocolError;
    use crate::protocol::Implementation;
    use crate::session::{Session, SessionPhase, SessionTable};

    fn client() -> Implementation {
        Implementation::new("test-client", "1.0.0")
    }

    #[test]
    fn lifecycle() {
        let session = Session::new();
        assert_eq!(session.phase(), SessionPhase::Uninitialized);
        assert_eq!(session.ensure_ready(), Err(ProtocolError::NotInitialized));

        session.initialize("2024-11-05".into(), client()).unwrap();
        assert_eq!(session.phase(), SessionPhase::Initialized);
        assert!(session.ensure_ready().is_ok());
        assert_eq!(session.protocol_version().as_deref(), Some("2024-11-05"));

        assert!(matches!(
            session.initialize("2024-11-05".into(), client()),
            Err(ProtocolError::InvalidRequest(_))
        ));

        assert!(session.close());
        assert!(!session.close());
        assert_eq!(session.ensure_ready(), Err(ProtocolError::SessionClosed));
        assert_eq!(
            session.initialize("2024-11-05".into(), client()),
            Err(ProtocolError::SessionClosed)
        );
    }

    #[test]
    fn clones_share_state() {
        let a = Session::new();
        let b = a.clone();
        a.initialize("2025-06-18".into(), client()).unwrap();
        assert_eq!(b.phase(), SessionPhase::Initialized);
    }

    #[test]
    fn table_keeps_closed_sessions() {
        let table = SessionTable::new();
        let session = Session::with_id("s1");
        assert!(table.insert(session.clone()));
        assert!(!table.insert(Session::with_id("s1")));
        assert_eq!(table.open_count(), 1);

        assert!(table.close("s1"));
        assert!(!table.close("missing"));
        assert_eq!(table.open_count(), 0);
        assert_eq!(table.get("s1").unwrap().phase(), SessionPhase::Closed);
    }

    #[test]
    fn table_forgets_oldest_closed_sessions() {
        let table = SessionTable::with_closed_limit(2);
        for id in ["a", "b", "c", "open"] {
            assert!(table.insert(Session::with_id(id)));
        }
        for id in ["a", "b", "c"] {
            assert!(table.close(id));
        }
        // Closing twice does not count against the limit again.
        assert!(table.close("c"));

        assert!(table.get("a").is_none());
        assert_eq!(table.get("b").unwrap().phase(), SessionPhase::Closed);
        assert_eq!(table.get("c").unwrap().phase(), SessionPhase::Closed);
        assert_eq!(table.get("open").unwrap().phase(), SessionPhase::Uninitialized);
        assert_eq!(table.len(), 3);
        assert_eq!(table.open_count(), 1);
    }
}
