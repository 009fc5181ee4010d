//! Per-user study settings.
//!
//! Stores user preferences including:
//! - Pomodoro and break durations (minutes) and the long-break cadence
//! - Color theme
//! - Sound and notification toggles
//! - Auto-start behaviour between intervals
//!
//! Settings are persisted per user in the database (see
//! [`Database::load_settings`](super::Database::load_settings)).

use serde::{Deserialize, Serialize};

use super::{json_value_by_path, set_json_value_by_path};
use crate::error::{ConfigError, Result, ValidationError};
use crate::timer::{ModeDurations, TimerPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTheme {
    Blue,
    Green,
    Purple,
    Orange,
}

/// Colors for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemePalette {
    pub name: &'static str,
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
}

impl ColorTheme {
    pub fn palette(self) -> ThemePalette {
        match self {
            ColorTheme::Blue => ThemePalette {
                name: "Ocean Blue",
                primary: "#007ba7",
                secondary: "#3395b9",
                accent: "#66b0ca",
            },
            ColorTheme::Green => ThemePalette {
                name: "Forest Green",
                primary: "#2d5a27",
                secondary: "#4a7c59",
                accent: "#6b9b37",
            },
            ColorTheme::Purple => ThemePalette {
                name: "Royal Purple",
                primary: "#6b46c1",
                secondary: "#8b5cf6",
                accent: "#a78bfa",
            },
            ColorTheme::Orange => ThemePalette {
                name: "Sunset Orange",
                primary: "#ea580c",
                secondary: "#fb923c",
                accent: "#fdba74",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_pomodoro")]
    pub pomodoro_duration: u32,
    #[serde(default = "default_short_break")]
    pub short_break_duration: u32,
    #[serde(default = "default_long_break")]
    pub long_break_duration: u32,
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default = "default_theme")]
    pub color_theme: ColorTheme,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_50")]
    pub sound_volume: u32,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_pomodoros: bool,
}

fn default_pomodoro() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_long_break_interval() -> u32 {
    4
}
fn default_theme() -> ColorTheme {
    ColorTheme::Blue
}
fn default_true() -> bool {
    true
}
fn default_50() -> u32 {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pomodoro_duration: default_pomodoro(),
            short_break_duration: default_short_break(),
            long_break_duration: default_long_break(),
            long_break_interval: default_long_break_interval(),
            color_theme: default_theme(),
            sound_enabled: true,
            sound_volume: 50,
            notifications_enabled: true,
            auto_start_breaks: false,
            auto_start_pomodoros: false,
        }
    }
}

impl Settings {
    /// Reject values the timer cannot run with.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("pomodoro_duration", self.pomodoro_duration),
            ("short_break_duration", self.short_break_duration),
            ("long_break_duration", self.long_break_duration),
            ("long_break_interval", self.long_break_interval),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ValidationError::invalid(field, "must be at least 1"));
            }
        }
        if self.sound_volume > 100 {
            return Err(ValidationError::invalid(
                "sound_volume",
                format!("{} is above 100", self.sound_volume),
            ));
        }
        Ok(())
    }

    pub fn mode_durations(&self) -> ModeDurations {
        ModeDurations::from_minutes(
            self.pomodoro_duration,
            self.short_break_duration,
            self.long_break_duration,
        )
    }

    pub fn theme(&self) -> ThemePalette {
        self.color_theme.palette()
    }

    /// Get a value as string by key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by key. The result is validated before it is applied;
    /// on error `self` is unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        set_json_value_by_path(&mut json, key, value)?;
        let updated: Settings =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

impl From<&Settings> for TimerPolicy {
    fn from(s: &Settings) -> Self {
        TimerPolicy {
            durations: s.mode_durations(),
            long_break_interval: s.long_break_interval.max(1),
            auto_start_breaks: s.auto_start_breaks,
            auto_start_pomodoros: s.auto_start_pomodoros,
            sound_enabled: s.sound_enabled,
            sound_volume: u8::try_from(s.sound_volume.min(100)).unwrap_or(100),
            notifications_enabled: s.notifications_enabled,
        }
    }
}
