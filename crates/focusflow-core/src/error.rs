//! Errors for focusflow-core.
//!
//! One `thiserror` hierarchy shared by the timer, the stores and the
//! gateways. Persistence and notification failures raised inside the timer
//! engine are logged and swallowed; everything else is surfaced to callers.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("storage: {0}")]
    Database(#[from] DatabaseError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Chat-completion service or keyring
    #[error("assistant: {0}")]
    Gateway(#[from] GatewayError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The acting user may not do this (not host, not member, bad code)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Already a member, already friends
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("cannot open {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("schema migration failed: {0}")]
    MigrationFailed(String),

    /// Another process holds the write lock (e.g. `timer run` in a second shell)
    #[error("database is busy")]
    Locked,

    #[error("unreadable value in {column}: {value}")]
    CorruptValue { column: String, value: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("cannot write {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("bad value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    /// Text that is blank once trimmed
    #[error("{0} must not be empty")]
    Empty(String),

    #[error("{field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("API key not configured (set assistant.api_key, OPENAI_API_KEY or run `assistant set-key`)")]
    MissingApiKey,

    #[error("Invalid API key. Please check your assistant configuration.")]
    Unauthorized,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connect, TLS and timeout failures
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("keyring: {0}")]
    Keyring(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        let busy = matches!(
            &err,
            rusqlite::Error::SqliteFailure(code, _)
                if matches!(code.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
        );
        if busy {
            DatabaseError::Locked
        } else {
            DatabaseError::QueryFailed(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

impl From<keyring::Error> for GatewayError {
    fn from(err: keyring::Error) -> Self {
        GatewayError::Keyring(err.to_string())
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = CoreError::not_found("task", "abc");
        assert_eq!(err.to_string(), "task not found: abc");
    }

    #[test]
    fn rusqlite_errors_convert_through_database_error() {
        let err: CoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, CoreError::Database(DatabaseError::QueryFailed(_))));
    }

    #[test]
    fn validation_messages_name_the_field() {
        let err: CoreError = ValidationError::Empty("text".into()).into();
        assert_eq!(err.to_string(), "invalid input: text must not be empty");
    }
}
