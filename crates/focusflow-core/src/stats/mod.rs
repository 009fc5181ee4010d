//! Study analytics over the session log.
//!
//! Everything here is a pure function of the logged sessions and a reference
//! instant, so reports are reproducible in tests. Days are UTC calendar days.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;
use crate::session::CompletedSession;
use crate::timer::Mode;

/// Window of sessions a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Week,
    Month,
    All,
}

impl Period {
    /// Earliest instant included in the window, if bounded.
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::Week => Some(now - Duration::days(7)),
            Period::Month => Some(now - Duration::days(30)),
            Period::All => None,
        }
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "all" => Ok(Period::All),
            other => Err(ValidationError::invalid(
                "period",
                format!("'{other}' (expected week, month or all)"),
            )),
        }
    }
}

/// Headline numbers for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub period: Period,
    pub completed_pomodoros: usize,
    pub total_study_secs: u64,
    pub total_break_secs: u64,
    /// Mean Pomodoro length; 0 when there are none.
    pub average_session_secs: u64,
    /// Completed sessions of any mode in the last 7 days.
    pub sessions_this_week: usize,
    pub total_study: String,
    pub average_session: String,
}

/// Study time for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStudy {
    /// Short weekday name ("Mon").
    pub day: String,
    pub date: NaiveDate,
    /// Pomodoro minutes, rounded.
    pub minutes: u64,
    pub sessions: usize,
}

/// Read-only view over completed sessions at a fixed instant.
#[derive(Debug, Clone)]
pub struct Analytics {
    sessions: Vec<CompletedSession>,
    now: DateTime<Utc>,
    period: Period,
}

impl Analytics {
    /// Analytics over every completed session in `sessions`.
    pub fn over(sessions: Vec<CompletedSession>, now: DateTime<Utc>) -> Self {
        let sessions = sessions.into_iter().filter(|s| s.completed).collect();
        Self {
            sessions,
            now,
            period: Period::All,
        }
    }

    /// Restrict to the given period.
    pub fn for_period(mut self, period: Period) -> Self {
        if let Some(since) = period.since(self.now) {
            self.sessions.retain(|s| s.occurred_at >= since);
        }
        self.period = period;
        self
    }

    pub fn sessions(&self) -> &[CompletedSession] {
        &self.sessions
    }

    fn pomodoros(&self) -> impl Iterator<Item = &CompletedSession> {
        self.sessions.iter().filter(|s| s.mode == Mode::Pomodoro)
    }

    pub fn completed_pomodoros(&self) -> usize {
        self.pomodoros().count()
    }

    pub fn total_study_secs(&self) -> u64 {
        self.pomodoros().map(|s| s.duration_secs).sum()
    }

    pub fn total_break_secs(&self) -> u64 {
        self.sessions
            .iter()
            .filter(|s| s.mode.is_break())
            .map(|s| s.duration_secs)
            .sum()
    }

    pub fn average_session_secs(&self) -> u64 {
        match self.completed_pomodoros() {
            0 => 0,
            n => self.total_study_secs() / n as u64,
        }
    }

    pub fn sessions_this_week(&self) -> usize {
        let since = self.now - Duration::days(7);
        self.sessions.iter().filter(|s| s.occurred_at >= since).count()
    }

    pub fn summary(&self) -> Summary {
        let total_study_secs = self.total_study_secs();
        let average_session_secs = self.average_session_secs();
        Summary {
            period: self.period,
            completed_pomodoros: self.completed_pomodoros(),
            total_study_secs,
            total_break_secs: self.total_break_secs(),
            average_session_secs,
            sessions_this_week: self.sessions_this_week(),
            total_study: format_duration(total_study_secs),
            average_session: format_duration(average_session_secs),
        }
    }

    /// Pomodoro time for the last 7 days including today, oldest first.
    pub fn daily(&self) -> Vec<DailyStudy> {
        (0..7)
            .rev()
            .map(|days_ago| {
                let date = (self.now - Duration::days(days_ago)).date_naive();
                let (secs, sessions) = self
                    .pomodoros()
                    .filter(|s| s.occurred_at.date_naive() == date)
                    .fold((0u64, 0usize), |(secs, n), s| (secs + s.duration_secs, n + 1));
                DailyStudy {
                    day: date.format("%a").to_string(),
                    date,
                    minutes: (secs + 30) / 60,
                    sessions,
                }
            })
            .collect()
    }

    /// The `n` most recent sessions, newest first.
    pub fn recent(&self, n: usize) -> Vec<CompletedSession> {
        let mut sorted = self.sessions.clone();
        sorted.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        sorted.truncate(n);
        sorted
    }
}

/// "1h 5m" for durations of an hour or more, otherwise "5m".
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
