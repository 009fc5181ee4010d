mod driver;
mod engine;
mod mode;
mod recovery;

pub use driver::{attach, TICK_PERIOD};
pub use engine::{Collaborators, TimerEngine, TimerPolicy, TimerState};
pub use mode::{format_clock, Mode, ModeDurations};
pub use recovery::{MemoryRecoveryStore, RecoverySnapshot, RecoveryStore};
