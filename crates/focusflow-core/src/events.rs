use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::CompletedSession;
use crate::timer::Mode;

/// Every timer state change produces an Event.
/// The CLI prints them; callers of the engine may react to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        mode: Mode,
        remaining_secs: u64,
        session_id: String,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ModeChanged {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// An interval ran to zero. `next_mode` is already loaded.
    SessionCompleted {
        session: CompletedSession,
        next_mode: Mode,
        /// Whether the next interval was auto-started.
        auto_started: bool,
        at: DateTime<Utc>,
    },
    /// A countdown was reconstructed from the recovery snapshot.
    TimerRecovered {
        mode: Mode,
        remaining_secs: u64,
        running: bool,
        /// Session recorded because the interval ended while suspended.
        recorded: Option<CompletedSession>,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        mode: Mode,
        remaining_secs: u64,
        total_secs: u64,
        running: bool,
        display: String,
        completed_pomodoros: u32,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn is_completion(&self) -> bool {
        matches!(self, Event::SessionCompleted { .. })
    }
}
