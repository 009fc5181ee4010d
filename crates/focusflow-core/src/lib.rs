//! # FocusFlow Core Library
//!
//! This library provides the core business logic for FocusFlow, a study
//! companion built around a Pomodoro timer. Every operation is available via
//! the standalone `focusflow` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A single-threaded state machine advanced by a periodic
//!   tick, with wall-clock recovery after suspension or restart
//! - **Storage**: SQLite for sessions, settings, tasks, calendar, friends and
//!   study groups; TOML for application configuration
//! - **Gateways**: Friend graph, study groups and an AI study assistant
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`Database`]: Persistence for every per-user record
//! - [`Config`]: Application configuration management
//! - [`Analytics`]: Study statistics over the session log

pub mod assistant;
pub mod calendar;
pub mod clock;
pub mod error;
pub mod events;
pub mod groups;
pub mod notify;
pub mod scheduler;
pub mod session;
pub mod social;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use assistant::{ChatAssistant, OpenAiAssistant};
pub use calendar::{month_grid, CalendarEntry, MonthGrid, Priority};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, GatewayError, Result, ValidationError};
pub use events::Event;
pub use groups::{ChatMessage, Invitation, MessageType, StudyGroup, StudyGroups};
pub use notify::{Notifier, RecordingNotifier, TerminalNotifier};
pub use scheduler::{ManualScheduler, Scheduler, TickHandle, TokioScheduler};
pub use session::{CompletedSession, MemorySessionLog, SessionLog};
pub use social::{ProfileDetails, SocialGraph, UserProfile};
pub use stats::{format_duration, Analytics, DailyStudy, Period, Summary};
pub use storage::{Config, Database, Settings};
pub use task::Task;
pub use timer::{Mode, RecoverySnapshot, RecoveryStore, TimerEngine, TimerPolicy, TimerState};
