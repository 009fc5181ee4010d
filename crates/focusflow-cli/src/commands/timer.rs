use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use clap::Subcommand;
use focusflow_core::timer::{attach, format_clock, Collaborators, TICK_PERIOD};
use focusflow_core::{
    format_duration, Config, Database, Event, Mode, Scheduler, SystemClock, TerminalNotifier,
    TimerEngine, TimerPolicy, TokioScheduler,
};
use tracing::{info, warn};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print current timer state as JSON
    Status,
    /// Start the countdown, or pause it if running
    Toggle,
    /// Switch mode (pomodoro, short-break, long-break); stops the countdown
    Mode {
        mode: Mode,
    },
    /// Advance a running countdown by whole seconds without waiting
    Tick {
        #[arg(default_value_t = 1)]
        seconds: u64,
    },
    /// Run the countdown in the foreground with a live display (Ctrl-C to detach)
    Run {
        /// Exit after the current interval finishes
        #[arg(long)]
        until_complete: bool,
    },
}

/// Rebuild the engine from persisted state and catch up with the wall clock.
fn load_engine(db: &Rc<Database>) -> Result<TimerEngine, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let settings = db.load_settings(&config.profile.user_id)?;
    let policy = TimerPolicy::from(&settings);
    let deps = Collaborators {
        clock: Box::new(SystemClock),
        recovery: Box::new(Rc::clone(db)),
        log: Box::new(Rc::clone(db)),
        notifier: Box::new(TerminalNotifier),
    };
    let mut engine = match db.load_timer_state()? {
        Some(state) => TimerEngine::with_state(policy, deps, state),
        None => TimerEngine::new(policy, deps),
    };
    if let Some(Event::TimerRecovered {
        mode,
        remaining_secs,
        running,
        recorded,
        ..
    }) = engine.recover()
    {
        info!(
            %mode,
            remaining_secs,
            running,
            recorded = recorded.is_some(),
            "timer recovered"
        );
    }
    Ok(engine)
}

fn save_engine(db: &Database, engine: &TimerEngine) -> CliResult {
    db.save_timer_state(engine.state())?;
    Ok(())
}

pub fn run(action: TimerAction) -> CliResult {
    let db = Rc::new(Database::open()?);
    let mut engine = load_engine(&db)?;

    match action {
        TimerAction::Status => {
            print_json(&engine.snapshot())?;
        }
        TimerAction::Toggle => {
            let event = engine.toggle();
            print_json(&event)?;
        }
        TimerAction::Mode { mode } => {
            let event = engine.set_mode(mode);
            print_json(&event)?;
        }
        TimerAction::Tick { seconds } => {
            let mut events = Vec::new();
            for _ in 0..seconds {
                if !engine.is_running() {
                    break;
                }
                if let Some(event) = engine.tick() {
                    events.push(event);
                }
            }
            engine.checkpoint();
            print_json(&serde_json::json!({
                "events": events,
                "state": engine.snapshot(),
            }))?;
        }
        TimerAction::Run { until_complete } => {
            if !engine.is_running() {
                engine.toggle();
            }
            save_engine(&db, &engine)?;
            engine = run_foreground(&db, engine, until_complete)?;
        }
    }

    save_engine(&db, &engine)
}

/// Drive the engine from a tokio interval on a `LocalSet` until Ctrl-C, or
/// until one interval completes when `until_complete` is set.
fn run_foreground(
    db: &Rc<Database>,
    engine: TimerEngine,
    until_complete: bool,
) -> Result<TimerEngine, Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    let engine = Rc::new(RefCell::new(engine));

    local.block_on(&rt, async {
        let scheduler = TokioScheduler;
        let done = Rc::new(tokio::sync::Notify::new());

        let _ticks = {
            let done = Rc::clone(&done);
            let db = Rc::clone(db);
            let view = Rc::clone(&engine);
            attach(Rc::clone(&engine), &scheduler, move |event| {
                if let Event::SessionCompleted {
                    session, next_mode, ..
                } = &event
                {
                    println!(
                        "\n{} finished ({}). Next: {}",
                        session.mode,
                        format_duration(session.duration_secs),
                        next_mode
                    );
                }
                if let Err(e) = db.save_timer_state(view.borrow().state()) {
                    warn!(error = %e, "failed to persist timer state");
                }
                if until_complete {
                    done.notify_one();
                }
            })
        };

        let _display = {
            let view = Rc::clone(&engine);
            scheduler.every(
                TICK_PERIOD,
                Box::new(move || {
                    let engine = view.borrow();
                    let marker = if engine.is_running() { "▶" } else { "⏸" };
                    print!(
                        "\r{marker} {:<11} {}",
                        engine.mode().label(),
                        format_clock(engine.remaining_secs())
                    );
                    if let Err(e) = std::io::stdout().flush() {
                        warn!(error = %e, "stdout flush failed");
                    }
                }),
            )
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                info!("detached; countdown continues in the background");
            }
            _ = done.notified() => {}
        }
    });
    // Dropping the set drops the tick tasks and their engine handles.
    drop(local);

    let mut engine = Rc::try_unwrap(engine)
        .map_err(|_| "timer engine still borrowed by the scheduler")?
        .into_inner();
    engine.checkpoint();
    Ok(engine)
}
