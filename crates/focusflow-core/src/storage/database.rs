//! SQLite-based storage.
//!
//! Provides persistent storage for:
//! - Completed timer sessions (the session log)
//! - Per-user settings
//! - Key-value store for application state (engine state, recovery snapshot)
//!
//! Task, calendar, social and study-group tables live in the same file; their
//! queries are implemented next to their domain types.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::data_dir;
use super::migrations;
use super::settings::Settings;
use crate::error::{DatabaseError, Result};
use crate::session::{CompletedSession, SessionLog};
use crate::timer::{Mode, RecoverySnapshot, RecoveryStore, TimerState};

const RECOVERY_KEY: &str = "recovery_snapshot";
const TIMER_STATE_KEY: &str = "timer_state";

/// SQLite database handle.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/focusflow.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("focusflow.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "opened database");
        Self::from_connection(conn)
    }

    /// Open an in-memory database (tests, simulations).
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // ── Key-value store ──────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    // ── Timer state ──────────────────────────────────────────────────

    /// Last persisted engine state, if any.
    pub fn load_timer_state(&self) -> Result<Option<TimerState>> {
        match self.kv_get(TIMER_STATE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_timer_state(&self, state: &TimerState) -> Result<()> {
        self.kv_set(TIMER_STATE_KEY, &serde_json::to_string(state)?)
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Settings for `user_id`, or defaults if none were saved.
    pub fn load_settings(&self, user_id: &str) -> Result<Settings> {
        let doc = self
            .conn
            .query_row(
                "SELECT document FROM settings WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match doc {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Settings::default()),
        }
    }

    /// Validate and store settings, replacing any previous document.
    pub fn save_settings(&self, user_id: &str, settings: &Settings) -> Result<()> {
        settings.validate()?;
        self.conn.execute(
            "INSERT INTO settings (user_id, document, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET document = excluded.document,
                                                updated_at = excluded.updated_at",
            params![user_id, serde_json::to_string(settings)?, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn reset_settings(&self, user_id: &str) -> Result<Settings> {
        self.conn
            .execute("DELETE FROM settings WHERE user_id = ?1", params![user_id])?;
        Ok(Settings::default())
    }
}

// ── Session log ──────────────────────────────────────────────────────

impl SessionLog for Database {
    fn append(&self, session: &CompletedSession) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO sessions (id, mode, duration_secs, completed, occurred_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id,
                session.mode.label(),
                session.duration_secs,
                session.completed,
                session.occurred_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn contains(&self, id: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM sessions WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn sessions(&self) -> Result<Vec<CompletedSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, mode, duration_secs, completed, occurred_at
             FROM sessions ORDER BY occurred_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, mode, duration_secs, completed, occurred_at) = row?;
            let mode: Mode = mode.parse().map_err(|_| DatabaseError::CorruptValue {
                column: "sessions.mode".into(),
                value: mode.clone(),
            })?;
            out.push(CompletedSession {
                id,
                occurred_at: parse_timestamp("sessions.occurred_at", &occurred_at)?,
                mode,
                duration_secs,
                completed,
            });
        }
        Ok(out)
    }
}

// ── Recovery snapshot ────────────────────────────────────────────────

impl RecoveryStore for Database {
    fn load(&self) -> Result<Option<RecoverySnapshot>> {
        match self.kv_get(RECOVERY_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &RecoverySnapshot) -> Result<()> {
        self.kv_set(RECOVERY_KEY, &serde_json::to_string(snapshot)?)
    }

    fn clear(&self) -> Result<()> {
        self.kv_delete(RECOVERY_KEY)
    }
}

/// Parse an RFC 3339 column value.
pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            DatabaseError::CorruptValue {
                column: column.to_string(),
                value: value.to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ColorTheme;

    fn session(id: &str, mode: Mode, secs: u64) -> CompletedSession {
        CompletedSession::new(id.into(), Utc::now(), mode, secs)
    }

    #[test]
    fn append_and_list_sessions() {
        let db = Database::open_memory().unwrap();
        db.append(&session("a", Mode::Pomodoro, 1500)).unwrap();
        db.append(&session("b", Mode::ShortBreak, 300)).unwrap();
        let all = db.sessions().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].mode, Mode::Pomodoro);
        assert_eq!(all[1].mode, Mode::ShortBreak);
        assert!(all.iter().all(|s| s.completed));
    }

    #[test]
    fn duplicate_append_is_ignored() {
        let db = Database::open_memory().unwrap();
        db.append(&session("a", Mode::Pomodoro, 1500)).unwrap();
        db.append(&session("a", Mode::Pomodoro, 1500)).unwrap();
        assert_eq!(db.sessions().unwrap().len(), 1);
        assert!(db.contains("a").unwrap());
        assert!(!db.contains("z").unwrap());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn recovery_snapshot_roundtrip_and_clear() {
        let db = Database::open_memory().unwrap();
        let snap = RecoverySnapshot {
            mode: Mode::LongBreak,
            remaining_secs: 42,
            start_epoch_ms: 7,
            running: true,
            session_id: "s".into(),
            completed_pomodoros: 4,
        };
        db.save(&snap).unwrap();
        assert_eq!(db.load().unwrap(), Some(snap));
        db.clear().unwrap();
        assert_eq!(db.load().unwrap(), None);
    }

    #[test]
    fn settings_are_per_user() {
        let db = Database::open_memory().unwrap();
        let mine = Settings {
            color_theme: ColorTheme::Green,
            pomodoro_duration: 40,
            ..Settings::default()
        };
        db.save_settings("me", &mine).unwrap();
        assert_eq!(db.load_settings("me").unwrap(), mine);
        assert_eq!(db.load_settings("you").unwrap(), Settings::default());
        db.reset_settings("me").unwrap();
        assert_eq!(db.load_settings("me").unwrap(), Settings::default());
    }

    #[test]
    fn invalid_settings_are_not_saved() {
        let db = Database::open_memory().unwrap();
        let bad = Settings {
            long_break_duration: 0,
            ..Settings::default()
        };
        assert!(db.save_settings("me", &bad).is_err());
        assert_eq!(db.load_settings("me").unwrap(), Settings::default());
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focusflow.db");
        let db = Database::open_at(&path).unwrap();
        db.kv_set("k", "v").unwrap();
        drop(db);
        let reopened = Database::open_at(&path).unwrap();
        assert_eq!(reopened.kv_get("k").unwrap().as_deref(), Some("v"));
    }
}
