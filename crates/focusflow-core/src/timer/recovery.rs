//! Durable recovery snapshot of an in-progress countdown.
//!
//! Written when a countdown starts, cleared on pause, mode change and
//! natural completion. On the next start-up the engine derives the remaining
//! time from the wall-clock delta since `start_epoch_ms`.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::mode::Mode;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverySnapshot {
    pub mode: Mode,
    pub remaining_secs: u64,
    pub start_epoch_ms: u64,
    pub running: bool,
    /// Id the session will be logged under; de-duplicates recovery.
    pub session_id: String,
    #[serde(default)]
    pub completed_pomodoros: u32,
}

impl RecoverySnapshot {
    /// Whole seconds left at `now_ms`, floored at zero.
    pub fn remaining_at(&self, now_ms: u64) -> u64 {
        if !self.running {
            return self.remaining_secs;
        }
        let elapsed_secs = now_ms.saturating_sub(self.start_epoch_ms) / 1000;
        self.remaining_secs.saturating_sub(elapsed_secs)
    }
}

/// Single-key durable store for the snapshot.
pub trait RecoveryStore {
    fn load(&self) -> Result<Option<RecoverySnapshot>>;
    fn save(&self, snapshot: &RecoverySnapshot) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

impl<T: RecoveryStore + ?Sized> RecoveryStore for Rc<T> {
    fn load(&self) -> Result<Option<RecoverySnapshot>> {
        (**self).load()
    }

    fn save(&self, snapshot: &RecoverySnapshot) -> Result<()> {
        (**self).save(snapshot)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// In-memory store. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecoveryStore {
    slot: Rc<RefCell<Option<RecoverySnapshot>>>,
}

impl MemoryRecoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peek(&self) -> Option<RecoverySnapshot> {
        self.slot.borrow().clone()
    }
}

impl RecoveryStore for MemoryRecoveryStore {
    fn load(&self) -> Result<Option<RecoverySnapshot>> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&self, snapshot: &RecoverySnapshot) -> Result<()> {
        *self.slot.borrow_mut() = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.borrow_mut() = None;
        Ok(())
    }
}
