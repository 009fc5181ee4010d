//! TOML-based application configuration.
//!
//! Holds what is not per-user study settings:
//! - The local profile the CLI acts as
//! - Chat-completion endpoint, model and (optionally) API key
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{data_dir, json_value_by_path, set_json_value_by_path};
use crate::error::{ConfigError, Result};

/// The identity used for per-user data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// Chat-completion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Plain-text key; prefer the keyring or OPENAI_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

fn default_user_id() -> String {
    "local".into()
}
fn default_username() -> String {
    "Student".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_max_tokens() -> u32 {
    500
}
fn default_temperature() -> f64 {
    0.7
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            username: default_username(),
            email: String::new(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_key: None,
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown
    /// or the value has the wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        // `api_key` is an Option and serializes as null; treat it as text.
        if key == "assistant.api_key" {
            if let Some(slot) = json.get_mut("assistant").and_then(|a| a.get_mut("api_key")) {
                *slot = serde_json::Value::String(String::new());
            }
        }
        set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.assistant.model, "gpt-3.5-turbo");
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "profile = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn get_and_set_dot_paths() {
        let mut cfg = Config::default();
        assert_eq!(cfg.get("profile.user_id").as_deref(), Some("local"));
        cfg.set("profile.username", "Ada").unwrap();
        cfg.set("assistant.max_tokens", "800").unwrap();
        assert_eq!(cfg.profile.username, "Ada");
        assert_eq!(cfg.assistant.max_tokens, 800);
        assert!(cfg.set("assistant.nope", "1").is_err());
    }

    #[test]
    fn api_key_can_be_set() {
        let mut cfg = Config::default();
        cfg.set("assistant.api_key", "sk-test").unwrap();
        assert_eq!(cfg.assistant.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[profile]\nuser_id = \"u1\"\n").unwrap();
        assert_eq!(cfg.profile.user_id, "u1");
        assert_eq!(cfg.profile.username, "Student");
        assert_eq!(cfg.assistant.max_tokens, 500);
    }
}
