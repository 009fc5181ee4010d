//! Integration tests for the timer engine against the SQLite store.
//!
//! These run the engine the way the CLI does: the database doubles as the
//! session log and the recovery store, and state is persisted between
//! "processes" by dropping one engine and building another.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use focusflow_core::timer::{attach, Collaborators};
use focusflow_core::{
    Analytics, Clock, Database, Event, ManualClock, ManualScheduler, Mode, Period,
    RecordingNotifier, RecoveryStore, SessionLog, TimerEngine, TimerPolicy,
};
use tempfile::TempDir;

const T0: u64 = 1_700_000_000_000;

struct Fixture {
    _dir: TempDir,
    db: Rc<Database>,
    clock: ManualClock,
    notifier: RecordingNotifier,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Rc::new(Database::open_at(&dir.path().join("focusflow.db")).unwrap());
        Self {
            _dir: dir,
            db,
            clock: ManualClock::new(T0),
            notifier: RecordingNotifier::new(),
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            clock: Box::new(self.clock.clone()),
            recovery: Box::new(Rc::clone(&self.db)),
            log: Box::new(Rc::clone(&self.db)),
            notifier: Box::new(self.notifier.clone()),
        }
    }

    /// Build an engine from whatever the previous run persisted.
    fn restart(&self) -> TimerEngine {
        match self.db.load_timer_state().unwrap() {
            Some(state) => TimerEngine::with_state(TimerPolicy::default(), self.collaborators(), state),
            None => TimerEngine::new(TimerPolicy::default(), self.collaborators()),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.now_ms() as i64).unwrap()
    }
}

#[test]
fn test_interrupted_pomodoro_is_recorded_once_after_restart() {
    let fx = Fixture::new();
    let scheduler = ManualScheduler::new();

    let engine = Rc::new(RefCell::new(fx.restart()));
    let handle = attach(Rc::clone(&engine), &scheduler, |_| {});
    engine.borrow_mut().toggle();

    scheduler.advance_secs(600);
    fx.clock.advance_secs(600);
    assert_eq!(engine.borrow().remaining_secs(), 900);

    engine.borrow_mut().checkpoint();
    fx.db.save_timer_state(engine.borrow().state()).unwrap();
    drop(handle);
    drop(engine);

    // Away for an hour; the Pomodoro ended while nobody was watching.
    fx.clock.advance_secs(3600);
    let mut engine = fx.restart();
    let recovered = engine.recover().unwrap();
    match recovered {
        Event::TimerRecovered {
            mode,
            remaining_secs,
            running,
            recorded: Some(session),
            ..
        } => {
            assert_eq!(mode, Mode::Pomodoro);
            assert_eq!(remaining_secs, 0);
            assert!(!running);
            assert_eq!(session.mode, Mode::Pomodoro);
            assert_eq!(session.duration_secs, 1500);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(engine.completed_pomodoros(), 1);
    assert_eq!(fx.notifier.notifications().len(), 2);
    fx.db.save_timer_state(engine.state()).unwrap();

    // A second restart finds no snapshot and records nothing new.
    let mut engine = fx.restart();
    assert!(engine.recover().is_none());
    assert_eq!(fx.db.sessions().unwrap().len(), 1);

    // The next start moves on to the break.
    match engine.toggle() {
        Event::TimerStarted { mode, remaining_secs, .. } => {
            assert_eq!(mode, Mode::ShortBreak);
            assert_eq!(remaining_secs, 300);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_resumed_countdown_completes_under_its_original_id() {
    let fx = Fixture::new();

    let mut engine = fx.restart();
    let session_id = match engine.toggle() {
        Event::TimerStarted { session_id, .. } => session_id,
        other => panic!("unexpected event: {other:?}"),
    };
    fx.db.save_timer_state(engine.state()).unwrap();
    drop(engine);

    fx.clock.advance_ms(100_400);
    let engine = Rc::new(RefCell::new(fx.restart()));
    engine.borrow_mut().recover().unwrap();
    assert!(engine.borrow().is_running());
    assert_eq!(engine.borrow().remaining_secs(), 1400);

    let scheduler = ManualScheduler::new();
    let completions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&completions);
    let _handle = attach(Rc::clone(&engine), &scheduler, move |e| sink.borrow_mut().push(e));
    scheduler.advance_secs(1400);

    assert_eq!(completions.borrow().len(), 1);
    let sessions = fx.db.sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, session_id);
    assert!(RecoveryStore::load(&*fx.db).unwrap().is_none());
}

#[test]
fn test_four_pomodoros_feed_analytics_and_long_break() {
    let fx = Fixture::new();
    let scheduler = ManualScheduler::new();
    let engine = Rc::new(RefCell::new(fx.restart()));
    let _handle = attach(Rc::clone(&engine), &scheduler, |_| {});

    for _ in 0..4 {
        if engine.borrow().mode() != Mode::Pomodoro {
            engine.borrow_mut().set_mode(Mode::Pomodoro);
        }
        engine.borrow_mut().toggle();
        scheduler.advance_secs(1500);
        fx.clock.advance_secs(1500);
    }
    assert_eq!(engine.borrow().mode(), Mode::LongBreak);
    assert_eq!(engine.borrow().remaining_secs(), 900);

    let analytics = Analytics::over(fx.db.sessions().unwrap(), fx.now()).for_period(Period::Week);
    let summary = analytics.summary();
    assert_eq!(summary.completed_pomodoros, 4);
    assert_eq!(summary.total_study_secs, 6000);
    assert_eq!(summary.total_study, "1h 40m");
    assert_eq!(analytics.daily().iter().map(|d| d.sessions).sum::<usize>(), 4);
}
