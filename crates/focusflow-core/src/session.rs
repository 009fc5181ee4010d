//! Completed sessions and the append-only log that stores them.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timer::Mode;

/// One finished timer interval. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSession {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub mode: Mode,
    pub duration_secs: u64,
    pub completed: bool,
}

impl CompletedSession {
    pub fn new(id: String, occurred_at: DateTime<Utc>, mode: Mode, duration_secs: u64) -> Self {
        Self {
            id,
            occurred_at,
            mode,
            duration_secs,
            completed: true,
        }
    }
}

/// Append-only session storage consumed by analytics.
pub trait SessionLog {
    fn append(&self, session: &CompletedSession) -> Result<()>;

    /// Whether a session with this id has already been recorded.
    fn contains(&self, id: &str) -> Result<bool>;

    /// All sessions, oldest first.
    fn sessions(&self) -> Result<Vec<CompletedSession>>;
}

impl<T: SessionLog + ?Sized> SessionLog for Rc<T> {
    fn append(&self, session: &CompletedSession) -> Result<()> {
        (**self).append(session)
    }

    fn contains(&self, id: &str) -> Result<bool> {
        (**self).contains(id)
    }

    fn sessions(&self) -> Result<Vec<CompletedSession>> {
        (**self).sessions()
    }
}

/// In-memory log. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionLog {
    sessions: Rc<RefCell<Vec<CompletedSession>>>,
}

impl MemorySessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.borrow().is_empty()
    }
}

impl SessionLog for MemorySessionLog {
    fn append(&self, session: &CompletedSession) -> Result<()> {
        self.sessions.borrow_mut().push(session.clone());
        Ok(())
    }

    fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.sessions.borrow().iter().any(|s| s.id == id))
    }

    fn sessions(&self) -> Result<Vec<CompletedSession>> {
        Ok(self.sessions.borrow().clone())
    }
}
