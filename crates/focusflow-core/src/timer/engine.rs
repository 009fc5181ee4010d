//! Timer engine implementation.
//!
//! The engine is a single-threaded countdown state machine. It owns no
//! threads: a periodic callback (see [`crate::scheduler`]) calls `tick()`
//! once per second while the countdown runs.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --toggle--> Running --toggle--> Idle (remaining = duration - elapsed)
//! Running --tick, remaining == 0--> Idle (next mode, full duration) + session
//! Idle | Running --set_mode--> Idle (new mode, full duration)
//! ```
//!
//! Interruptions (process exit, suspend) are survived through a recovery
//! snapshot: remaining time is recomputed from the wall-clock delta rather
//! than from the number of ticks that happened to fire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::mode::{format_clock, Mode, ModeDurations};
use super::recovery::{RecoverySnapshot, RecoveryStore};
use crate::clock::Clock;
use crate::events::Event;
use crate::notify::Notifier;
use crate::session::{CompletedSession, SessionLog};

/// Serializable engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub mode: Mode,
    pub remaining_secs: u64,
    pub running: bool,
    /// Set while a countdown runs; basis for elapsed-time recomputation.
    #[serde(default)]
    pub start_epoch_ms: Option<u64>,
    /// `remaining_secs` at the moment `start_epoch_ms` was taken.
    #[serde(default)]
    pub anchor_remaining_secs: u64,
    /// Pomodoros completed so far; drives the long-break cycle.
    #[serde(default)]
    pub completed_pomodoros: u32,
    /// Id of the interval in progress, kept across pause/resume.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl TimerState {
    pub fn initial(durations: &ModeDurations) -> Self {
        Self {
            mode: Mode::Pomodoro,
            remaining_secs: durations.secs(Mode::Pomodoro),
            running: false,
            start_epoch_ms: None,
            anchor_remaining_secs: 0,
            completed_pomodoros: 0,
            session_id: None,
        }
    }
}

/// Everything the engine reads from user settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerPolicy {
    pub durations: ModeDurations,
    /// Every N-th completed Pomodoro is followed by a long break.
    pub long_break_interval: u32,
    pub auto_start_breaks: bool,
    pub auto_start_pomodoros: bool,
    pub sound_enabled: bool,
    pub sound_volume: u8,
    pub notifications_enabled: bool,
}

impl Default for TimerPolicy {
    fn default() -> Self {
        Self {
            durations: ModeDurations::default(),
            long_break_interval: 4,
            auto_start_breaks: false,
            auto_start_pomodoros: false,
            sound_enabled: true,
            sound_volume: 50,
            notifications_enabled: true,
        }
    }
}

/// Injected capabilities.
pub struct Collaborators {
    pub clock: Box<dyn Clock>,
    pub recovery: Box<dyn RecoveryStore>,
    pub log: Box<dyn SessionLog>,
    pub notifier: Box<dyn Notifier>,
}

pub struct TimerEngine {
    state: TimerState,
    policy: TimerPolicy,
    clock: Box<dyn Clock>,
    recovery: Box<dyn RecoveryStore>,
    log: Box<dyn SessionLog>,
    notifier: Box<dyn Notifier>,
}

impl TimerEngine {
    /// Create an idle engine in Pomodoro mode with the full duration loaded.
    pub fn new(policy: TimerPolicy, deps: Collaborators) -> Self {
        let state = TimerState::initial(&policy.durations);
        Self::with_state(policy, deps, state)
    }

    /// Restore an engine from previously persisted state.
    pub fn with_state(policy: TimerPolicy, deps: Collaborators, state: TimerState) -> Self {
        Self {
            state,
            policy,
            clock: deps.clock,
            recovery: deps.recovery,
            log: deps.log,
            notifier: deps.notifier,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn remaining_secs(&self) -> u64 {
        self.state.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn completed_pomodoros(&self) -> u32 {
        self.state.completed_pomodoros
    }

    pub fn policy(&self) -> &TimerPolicy {
        &self.policy
    }

    pub fn duration_secs(&self, mode: Mode) -> u64 {
        self.policy.durations.secs(mode)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            total_secs: self.duration_secs(self.state.mode),
            running: self.state.running,
            display: format_clock(self.state.remaining_secs),
            completed_pomodoros: self.state.completed_pomodoros,
            at: self.now(),
        }
    }

    /// The mode that follows `mode` given the current Pomodoro count.
    pub fn next_mode_after(&self, mode: Mode) -> Mode {
        match mode {
            Mode::Pomodoro => {
                let interval = self.policy.long_break_interval.max(1);
                if self.state.completed_pomodoros > 0
                    && self.state.completed_pomodoros % interval == 0
                {
                    Mode::LongBreak
                } else {
                    Mode::ShortBreak
                }
            }
            Mode::ShortBreak | Mode::LongBreak => Mode::Pomodoro,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Switch mode. Stops a running countdown; never emits a session.
    pub fn set_mode(&mut self, mode: Mode) -> Event {
        if self.state.running {
            debug!(from = %self.state.mode, to = %mode, "stopping countdown for mode change");
        }
        self.stop_countdown();
        self.clear_snapshot();
        self.load_mode(mode);
        Event::ModeChanged {
            mode,
            remaining_secs: self.state.remaining_secs,
            at: self.now(),
        }
    }

    /// Start when idle, pause when running.
    pub fn toggle(&mut self) -> Event {
        if self.state.running {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `Some(Event::SessionCompleted)` when the interval finishes.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.running {
            return None;
        }
        self.state.remaining_secs = self.state.remaining_secs.saturating_sub(1);
        if self.state.remaining_secs > 0 {
            return None;
        }
        Some(self.finish())
    }

    /// Record a finished interval, notify, and advance to the next mode.
    pub fn on_session_complete(&mut self, mode: Mode, duration_secs: u64) -> Event {
        let id = self
            .state
            .session_id
            .take()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let session = CompletedSession::new(id, self.now(), mode, duration_secs);
        self.record(&session);
        self.notify_completion(mode);
        if mode == Mode::Pomodoro {
            self.state.completed_pomodoros = self.state.completed_pomodoros.saturating_add(1);
        }

        let next = self.next_mode_after(mode);
        self.load_mode(next);
        info!(
            mode = %mode,
            duration_secs,
            next = %next,
            completed_pomodoros = self.state.completed_pomodoros,
            "session completed"
        );

        let auto_start = if next.is_break() {
            self.policy.auto_start_breaks
        } else {
            self.policy.auto_start_pomodoros
        };
        if auto_start {
            self.start();
        }

        Event::SessionCompleted {
            session,
            next_mode: next,
            auto_started: auto_start,
            at: self.now(),
        }
    }

    /// Rebuild the countdown from a durable snapshot taken before an
    /// interruption.
    pub fn recover_from_snapshot(&mut self, snapshot: RecoverySnapshot, now_ms: u64) -> Event {
        self.state.mode = snapshot.mode;
        self.state.completed_pomodoros = snapshot.completed_pomodoros;
        self.state.session_id = Some(snapshot.session_id.clone());

        let remaining = snapshot.remaining_at(now_ms);
        let mut recorded = None;

        if snapshot.running && remaining > 0 {
            self.state.remaining_secs = remaining;
            self.state.running = true;
            self.state.start_epoch_ms = Some(reanchor(snapshot.start_epoch_ms, now_ms));
            self.state.anchor_remaining_secs = remaining;
            self.save_snapshot();
            info!(mode = %snapshot.mode, remaining, "resumed countdown from snapshot");
        } else if snapshot.running {
            // The interval ran out while we were away.
            self.stop_countdown();
            self.state.remaining_secs = 0;
            self.clear_snapshot();
            let already = self.log.contains(&snapshot.session_id).unwrap_or_else(|e| {
                warn!(error = %e, "could not check session log; assuming not recorded");
                false
            });
            if already {
                debug!(session_id = %snapshot.session_id, "expired snapshot already recorded");
                if snapshot.mode == Mode::Pomodoro {
                    self.state.completed_pomodoros =
                        self.state.completed_pomodoros.saturating_add(1);
                }
            } else {
                let session = CompletedSession::new(
                    snapshot.session_id.clone(),
                    self.at(now_ms),
                    snapshot.mode,
                    self.duration_secs(snapshot.mode),
                );
                self.record(&session);
                self.notify_completion(snapshot.mode);
                if snapshot.mode == Mode::Pomodoro {
                    self.state.completed_pomodoros =
                        self.state.completed_pomodoros.saturating_add(1);
                }
                recorded = Some(session);
            }
            self.state.session_id = None;
            info!(mode = %snapshot.mode, "snapshot expired while suspended");
        } else {
            self.stop_countdown();
            self.state.remaining_secs = snapshot.remaining_secs;
            self.clear_snapshot();
        }

        Event::TimerRecovered {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            running: self.state.running,
            recorded,
            at: self.at(now_ms),
        }
    }

    /// Load the stored snapshot (if any) and recover from it at the
    /// clock's current time.
    pub fn recover(&mut self) -> Option<Event> {
        let snapshot = match self.recovery.load() {
            Ok(s) => s?,
            Err(e) => {
                warn!(error = %e, "failed to read recovery snapshot");
                return None;
            }
        };
        let now = self.clock.now_ms();
        Some(self.recover_from_snapshot(snapshot, now))
    }

    /// Re-anchor a running countdown at the current time and persist it, so
    /// ticks applied since the last anchor survive a restart.
    pub fn checkpoint(&mut self) {
        if !self.state.running {
            return;
        }
        let now = self.clock.now_ms();
        let start = self.state.start_epoch_ms.unwrap_or(now);
        self.state.start_epoch_ms = Some(reanchor(start, now));
        self.state.anchor_remaining_secs = self.state.remaining_secs;
        self.save_snapshot();
    }

    /// Apply new settings. An idle engine reloads the full duration of its
    /// current mode; a running countdown is left alone.
    pub fn set_policy(&mut self, policy: TimerPolicy) {
        self.policy = policy;
        if !self.state.running {
            self.state.remaining_secs = self.duration_secs(self.state.mode);
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn start(&mut self) -> Event {
        if self.state.remaining_secs == 0 {
            // Interval finished while suspended; move on before starting.
            let next = self.next_mode_after(self.state.mode);
            self.load_mode(next);
        }
        let now = self.clock.now_ms();
        self.state.running = true;
        self.state.start_epoch_ms = Some(now);
        self.state.anchor_remaining_secs = self.state.remaining_secs;
        let session_id = self
            .state
            .session_id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        self.save_snapshot();
        debug!(mode = %self.state.mode, remaining = self.state.remaining_secs, "timer started");
        Event::TimerStarted {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            session_id,
            at: self.at(now),
        }
    }

    fn pause(&mut self) -> Event {
        let now = self.clock.now_ms();
        if let Some(start) = self.state.start_epoch_ms {
            let elapsed_secs = now.saturating_sub(start) / 1000;
            let by_clock = self.state.anchor_remaining_secs.saturating_sub(elapsed_secs);
            self.state.remaining_secs = self.state.remaining_secs.min(by_clock);
        }
        if self.state.remaining_secs == 0 {
            // The wall clock says the interval is over.
            return self.finish();
        }
        self.stop_countdown();
        self.clear_snapshot();
        debug!(mode = %self.state.mode, remaining = self.state.remaining_secs, "timer paused");
        Event::TimerPaused {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            at: self.at(now),
        }
    }

    fn finish(&mut self) -> Event {
        let mode = self.state.mode;
        self.stop_countdown();
        self.state.remaining_secs = 0;
        self.clear_snapshot();
        self.on_session_complete(mode, self.duration_secs(mode))
    }

    fn stop_countdown(&mut self) {
        self.state.running = false;
        self.state.start_epoch_ms = None;
    }

    fn load_mode(&mut self, mode: Mode) {
        self.state.mode = mode;
        self.state.remaining_secs = self.duration_secs(mode);
        self.state.anchor_remaining_secs = 0;
        self.state.session_id = None;
    }

    fn save_snapshot(&self) {
        let (Some(start), Some(session_id)) =
            (self.state.start_epoch_ms, self.state.session_id.clone())
        else {
            return;
        };
        let snapshot = RecoverySnapshot {
            mode: self.state.mode,
            remaining_secs: self.state.anchor_remaining_secs,
            start_epoch_ms: start,
            running: true,
            session_id,
            completed_pomodoros: self.state.completed_pomodoros,
        };
        if let Err(e) = self.recovery.save(&snapshot) {
            warn!(error = %e, "failed to persist recovery snapshot");
        }
    }

    fn clear_snapshot(&self) {
        if let Err(e) = self.recovery.clear() {
            warn!(error = %e, "failed to clear recovery snapshot");
        }
    }

    fn record(&self, session: &CompletedSession) {
        if let Err(e) = self.log.append(session) {
            warn!(error = %e, session_id = %session.id, "failed to append session");
        }
    }

    fn notify_completion(&self, mode: Mode) {
        if self.policy.sound_enabled {
            if let Err(e) = self.notifier.play_sound(self.policy.sound_volume) {
                warn!(error = %e, "completion sound failed");
            }
        }
        if self.policy.notifications_enabled {
            let body = format!("{mode} session finished");
            if let Err(e) = self.notifier.show_notification("You did it!", &body) {
                warn!(error = %e, "completion notification failed");
            }
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.at(self.clock.now_ms())
    }

    fn at(&self, ms: u64) -> DateTime<Utc> {
        i64::try_from(ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now)
    }
}

/// Move an anchor up to `now_ms` while keeping its sub-second phase, so a
/// fraction of a second already elapsed is not lost on the next read.
fn reanchor(start_ms: u64, now_ms: u64) -> u64 {
    now_ms - now_ms.saturating_sub(start_ms) % 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::{Notification, RecordingNotifier};
    use crate::session::MemorySessionLog;
    use crate::timer::recovery::MemoryRecoveryStore;

    const T0: u64 = 1_700_000_000_000;

    struct Rig {
        engine: TimerEngine,
        clock: ManualClock,
        log: MemorySessionLog,
        store: MemoryRecoveryStore,
        notifier: RecordingNotifier,
    }

    fn rig_with(policy: TimerPolicy, notifier: RecordingNotifier) -> Rig {
        let clock = ManualClock::new(T0);
        let log = MemorySessionLog::new();
        let store = MemoryRecoveryStore::new();
        let engine = TimerEngine::new(
            policy,
            Collaborators {
                clock: Box::new(clock.clone()),
                recovery: Box::new(store.clone()),
                log: Box::new(log.clone()),
                notifier: Box::new(notifier.clone()),
            },
        );
        Rig {
            engine,
            clock,
            log,
            store,
            notifier,
        }
    }

    impl Rig {
        /// Fresh handles onto the same clock and stores, for a second engine.
        fn collaborators(&self) -> Collaborators {
            Collaborators {
                clock: Box::new(self.clock.clone()),
                recovery: Box::new(self.store.clone()),
                log: Box::new(self.log.clone()),
                notifier: Box::new(self.notifier.clone()),
            }
        }
    }

    fn rig() -> Rig {
        rig_with(TimerPolicy::default(), RecordingNotifier::new())
    }

    fn run_to_completion(r: &mut Rig) -> Event {
        if !r.engine.is_running() {
            r.engine.toggle();
        }
        loop {
            r.clock.advance_secs(1);
            if let Some(e) = r.engine.tick() {
                return e;
            }
        }
    }

    #[test]
    fn starts_idle_in_pomodoro() {
        let r = rig();
        assert_eq!(r.engine.mode(), Mode::Pomodoro);
        assert_eq!(r.engine.remaining_secs(), 1500);
        assert!(!r.engine.is_running());
    }

    #[test]
    fn set_mode_loads_full_duration_for_every_mode() {
        let mut r = rig();
        for mode in Mode::ALL {
            r.engine.set_mode(mode);
            assert_eq!(r.engine.remaining_secs(), r.engine.duration_secs(mode));
            assert!(!r.engine.is_running());
        }
        assert!(r.log.is_empty());
    }

    #[test]
    fn set_mode_while_running_stops_and_clears_snapshot() {
        let mut r = rig();
        r.engine.toggle();
        assert!(r.store.peek().is_some());
        r.clock.advance_secs(10);
        r.engine.set_mode(Mode::LongBreak);
        assert!(!r.engine.is_running());
        assert_eq!(r.engine.state().start_epoch_ms, None);
        assert_eq!(r.engine.remaining_secs(), 900);
        assert!(r.store.peek().is_none());
        assert!(r.log.is_empty());
    }

    #[test]
    fn toggle_start_writes_snapshot() {
        let mut r = rig();
        r.engine.toggle();
        let snap = r.store.peek().unwrap();
        assert!(snap.running);
        assert_eq!(snap.remaining_secs, 1500);
        assert_eq!(snap.start_epoch_ms, T0);
        assert_eq!(snap.mode, Mode::Pomodoro);
    }

    #[test]
    fn immediate_double_toggle_keeps_remaining() {
        let mut r = rig();
        r.engine.toggle();
        r.engine.toggle();
        assert_eq!(r.engine.remaining_secs(), 1500);
        assert!(!r.engine.is_running());
        assert!(r.store.peek().is_none());
    }

    #[test]
    fn pause_subtracts_wall_clock_elapsed() {
        let mut r = rig();
        r.engine.toggle();
        r.clock.advance_ms(42_700);
        let ev = r.engine.toggle();
        assert!(matches!(ev, Event::TimerPaused { remaining_secs: 1458, .. }));
    }

    #[test]
    fn ticks_and_pause_do_not_double_count() {
        let mut r = rig();
        r.engine.toggle();
        for _ in 0..10 {
            r.clock.advance_secs(1);
            r.engine.tick();
        }
        r.engine.toggle();
        assert_eq!(r.engine.remaining_secs(), 1490);
    }

    #[test]
    fn tick_when_idle_is_noop() {
        let mut r = rig();
        assert!(r.engine.tick().is_none());
        assert_eq!(r.engine.remaining_secs(), 1500);
    }

    #[test]
    fn full_pomodoro_emits_one_session_and_loads_short_break() {
        let mut r = rig();
        r.engine.toggle();
        let mut completions = Vec::new();
        for _ in 0..1500 {
            if let Some(e) = r.engine.tick() {
                completions.push(e);
            }
        }
        assert_eq!(completions.len(), 1);
        let sessions = r.log.sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].mode, Mode::Pomodoro);
        assert_eq!(sessions[0].duration_secs, 1500);
        assert!(sessions[0].completed);
        assert_eq!(r.engine.mode(), Mode::ShortBreak);
        assert_eq!(r.engine.remaining_secs(), 300);
        assert!(!r.engine.is_running());
        assert!(r.store.peek().is_none());
    }

    #[test]
    fn every_fourth_pomodoro_is_followed_by_long_break() {
        let mut r = rig();
        let mut breaks = Vec::new();
        for _ in 0..4 {
            assert_eq!(r.engine.mode(), Mode::Pomodoro);
            run_to_completion(&mut r);
            breaks.push(r.engine.mode());
            run_to_completion(&mut r);
        }
        assert_eq!(
            breaks,
            vec![
                Mode::ShortBreak,
                Mode::ShortBreak,
                Mode::ShortBreak,
                Mode::LongBreak
            ]
        );
        assert_eq!(r.engine.completed_pomodoros(), 4);
    }

    #[test]
    fn completion_notifies_with_configured_volume() {
        let policy = TimerPolicy {
            sound_volume: 80,
            ..TimerPolicy::default()
        };
        let mut r = rig_with(policy, RecordingNotifier::new());
        run_to_completion(&mut r);
        assert_eq!(
            r.notifier.notifications(),
            vec![
                Notification::Sound { volume: 80 },
                Notification::Banner {
                    title: "You did it!".into(),
                    body: "Pomodoro session finished".into()
                }
            ]
        );
    }

    #[test]
    fn disabled_channels_are_skipped() {
        let policy = TimerPolicy {
            sound_enabled: false,
            notifications_enabled: false,
            ..TimerPolicy::default()
        };
        let mut r = rig_with(policy, RecordingNotifier::new());
        run_to_completion(&mut r);
        assert!(r.notifier.notifications().is_empty());
    }

    #[test]
    fn notification_failures_never_block_transition() {
        let mut r = rig_with(TimerPolicy::default(), RecordingNotifier::failing());
        run_to_completion(&mut r);
        assert_eq!(r.log.len(), 1);
        assert_eq!(r.engine.mode(), Mode::ShortBreak);
        assert_eq!(r.notifier.notifications().len(), 2);
    }

    #[test]
    fn auto_start_breaks_starts_next_interval() {
        let policy = TimerPolicy {
            auto_start_breaks: true,
            ..TimerPolicy::default()
        };
        let mut r = rig_with(policy, RecordingNotifier::new());
        let ev = run_to_completion(&mut r);
        assert!(matches!(ev, Event::SessionCompleted { auto_started: true, .. }));
        assert!(r.engine.is_running());
        assert_eq!(r.engine.mode(), Mode::ShortBreak);
        assert!(r.store.peek().is_some());
    }

    #[test]
    fn recovery_resumes_with_wall_clock_remaining() {
        let mut r = rig();
        let snap = RecoverySnapshot {
            mode: Mode::Pomodoro,
            remaining_secs: 100,
            start_epoch_ms: T0,
            running: true,
            session_id: "abc".into(),
            completed_pomodoros: 0,
        };
        r.engine.recover_from_snapshot(snap, T0 + 30_000);
        assert_eq!(r.engine.remaining_secs(), 70);
        assert!(r.engine.is_running());
        assert_eq!(r.engine.state().start_epoch_ms, Some(T0 + 30_000));
        let rewritten = r.store.peek().unwrap();
        assert_eq!(rewritten.remaining_secs, 70);
        assert_eq!(rewritten.session_id, "abc");
    }

    #[test]
    fn expired_recovery_records_once_and_stops() {
        let mut r = rig();
        let snap = RecoverySnapshot {
            mode: Mode::Pomodoro,
            remaining_secs: 10,
            start_epoch_ms: T0,
            running: true,
            session_id: "abc".into(),
            completed_pomodoros: 0,
        };
        r.engine.recover_from_snapshot(snap.clone(), T0 + 15_000);
        assert_eq!(r.engine.remaining_secs(), 0);
        assert!(!r.engine.is_running());
        assert_eq!(r.log.len(), 1);
        assert!(r.store.peek().is_none());

        // A second recovery of the same snapshot must not duplicate it.
        r.engine.recover_from_snapshot(snap, T0 + 20_000);
        assert_eq!(r.log.len(), 1);
        assert_eq!(r.engine.completed_pomodoros(), 1);
    }

    #[test]
    fn toggle_after_expired_recovery_starts_next_mode() {
        let mut r = rig();
        let snap = RecoverySnapshot {
            mode: Mode::Pomodoro,
            remaining_secs: 10,
            start_epoch_ms: T0,
            running: true,
            session_id: "abc".into(),
            completed_pomodoros: 3,
        };
        r.engine.recover_from_snapshot(snap, T0 + 60_000);
        let ev = r.engine.toggle();
        assert!(matches!(
            ev,
            Event::TimerStarted {
                mode: Mode::LongBreak,
                remaining_secs: 900,
                ..
            }
        ));
    }

    #[test]
    fn recover_reads_store_and_clock() {
        let mut r = rig();
        r.engine.toggle();
        r.clock.advance_secs(600);
        // Fresh engine sharing the same store, as after a restart.
        let mut restarted = TimerEngine::new(
            TimerPolicy::default(),
            Collaborators {
                clock: Box::new(r.clock.clone()),
                recovery: Box::new(r.store.clone()),
                log: Box::new(r.log.clone()),
                notifier: Box::new(RecordingNotifier::new()),
            },
        );
        let ev = restarted.recover().unwrap();
        assert!(matches!(
            ev,
            Event::TimerRecovered {
                remaining_secs: 900,
                running: true,
                ..
            }
        ));
    }

    #[test]
    fn recover_without_snapshot_is_none() {
        let mut r = rig();
        assert!(r.engine.recover().is_none());
    }

    #[test]
    fn pause_past_zero_completes_interval() {
        let mut r = rig();
        r.engine.toggle();
        r.clock.advance_secs(2_000);
        let ev = r.engine.toggle();
        assert!(ev.is_completion());
        assert_eq!(r.log.len(), 1);
        assert_eq!(r.engine.mode(), Mode::ShortBreak);
    }

    #[test]
    fn session_id_survives_pause_and_resume() {
        let mut r = rig();
        let first = match r.engine.toggle() {
            Event::TimerStarted { session_id, .. } => session_id,
            other => panic!("unexpected {other:?}"),
        };
        r.engine.toggle();
        let second = match r.engine.toggle() {
            Event::TimerStarted { session_id, .. } => session_id,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(first, second);
    }

    #[test]
    fn state_roundtrips_through_json() {
        let mut r = rig();
        r.engine.toggle();
        let json = serde_json::to_string(r.engine.state()).unwrap();
        let back: TimerState = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, r.engine.state());
    }

    #[test]
    fn repeated_recovery_keeps_subsecond_phase() {
        let mut r = rig();
        let snap = RecoverySnapshot {
            mode: Mode::Pomodoro,
            remaining_secs: 100,
            start_epoch_ms: T0,
            running: true,
            session_id: "abc".into(),
            completed_pomodoros: 0,
        };
        r.engine.recover_from_snapshot(snap, T0 + 1_700);
        assert_eq!(r.engine.remaining_secs(), 99);
        assert_eq!(r.engine.state().start_epoch_ms, Some(T0 + 1_000));

        let again = r.store.peek().unwrap();
        r.engine.recover_from_snapshot(again, T0 + 2_100);
        assert_eq!(r.engine.remaining_secs(), 98);
    }

    #[test]
    fn checkpoint_persists_ticked_remaining() {
        let mut r = rig();
        r.engine.toggle();
        for _ in 0..10 {
            r.engine.tick();
        }
        r.engine.checkpoint();
        let snap = r.store.peek().unwrap();
        assert_eq!(snap.remaining_secs, 1490);
        assert_eq!(snap.start_epoch_ms, T0);
    }

    #[test]
    fn checkpoint_keeps_fraction_of_second_elapsed() {
        let mut r = rig();
        r.engine.toggle();
        r.clock.advance_ms(2_600);
        r.engine.tick();
        r.engine.tick();
        r.engine.checkpoint();
        let snap = r.store.peek().unwrap();
        assert_eq!(snap.remaining_secs, 1498);
        assert_eq!(snap.start_epoch_ms, T0 + 2_000);
        assert_eq!(snap.remaining_at(T0 + 3_000), 1497);
    }

    #[test]
    fn short_recover_checkpoint_cycles_follow_wall_clock() {
        let mut r = rig();
        r.engine.toggle();

        // One short-lived process every 0.9 s, each recovering then saving.
        for _ in 0..100 {
            r.clock.advance_ms(900);
            let mut next = TimerEngine::new(TimerPolicy::default(), r.collaborators());
            next.recover().unwrap();
            next.checkpoint();
        }
        let snap = r.store.peek().unwrap();
        assert_eq!(snap.remaining_at(r.clock.now_ms()), 1410);
    }

    #[test]
    fn checkpoint_when_idle_writes_nothing() {
        let mut r = rig();
        r.engine.checkpoint();
        assert!(r.store.peek().is_none());
    }
}
