use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// The current interval type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "Pomodoro")]
    Pomodoro,
    #[serde(rename = "Short Break")]
    ShortBreak,
    #[serde(rename = "Long Break")]
    LongBreak,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Pomodoro, Mode::ShortBreak, Mode::LongBreak];

    /// Display label, also used as the stored value.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Pomodoro => "Pomodoro",
            Mode::ShortBreak => "Short Break",
            Mode::LongBreak => "Long Break",
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, Mode::Pomodoro)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mode {
    type Err = ValidationError;

    /// Accepts labels ("Short Break") and CLI spellings ("short-break", "short").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match norm.as_str() {
            "pomodoro" | "focus" => Ok(Mode::Pomodoro),
            "shortbreak" | "short" => Ok(Mode::ShortBreak),
            "longbreak" | "long" => Ok(Mode::LongBreak),
            _ => Err(ValidationError::invalid(
                "mode",
                format!("'{s}' is not one of Pomodoro, Short Break, Long Break"),
            )),
        }
    }
}

/// Per-mode durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeDurations {
    pub pomodoro_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
}

impl ModeDurations {
    /// Build from minute values, as stored in settings.
    pub fn from_minutes(pomodoro: u32, short_break: u32, long_break: u32) -> Self {
        Self {
            pomodoro_secs: u64::from(pomodoro).saturating_mul(60),
            short_break_secs: u64::from(short_break).saturating_mul(60),
            long_break_secs: u64::from(long_break).saturating_mul(60),
        }
    }

    pub fn secs(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Pomodoro => self.pomodoro_secs,
            Mode::ShortBreak => self.short_break_secs,
            Mode::LongBreak => self.long_break_secs,
        }
    }
}

impl Default for ModeDurations {
    fn default() -> Self {
        Self::from_minutes(25, 5, 15)
    }
}

/// Render seconds as `MM:SS` (minutes may exceed two digits).
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
