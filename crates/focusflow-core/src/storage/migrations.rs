//! Database schema migrations for focusflow.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 5;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }
    if current_version < 4 {
        migrate_v4(conn)?;
    }
    if current_version < 5 {
        migrate_v5(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    debug!(version, "schema migrated");
    Ok(())
}

/// Migration v1: timer data.
///
/// - sessions: completed timer intervals (append-only)
/// - kv: single-key application state (engine state, recovery snapshot)
/// - settings: per-user settings document
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id            TEXT PRIMARY KEY,
            mode          TEXT NOT NULL,
            duration_secs INTEGER NOT NULL,
            completed     INTEGER NOT NULL DEFAULT 1,
            occurred_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS settings (
            user_id    TEXT PRIMARY KEY,
            document   TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_occurred_at ON sessions(occurred_at);
        CREATE INDEX IF NOT EXISTS idx_sessions_mode ON sessions(mode);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: task list and calendar.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id         TEXT PRIMARY KEY,
            user_id    TEXT NOT NULL,
            text       TEXT NOT NULL,
            completed  INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            seq        INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS calendar_entries (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            title       TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            date        TEXT NOT NULL,
            priority    TEXT NOT NULL DEFAULT 'normal',
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id, seq);
        CREATE INDEX IF NOT EXISTS idx_calendar_user_date ON calendar_entries(user_id, date);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: social graph (users, friendships, friend requests).
///
/// Friendships are stored as two directed rows so either side can be
/// queried with one index.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            user_id    TEXT PRIMARY KEY,
            username   TEXT NOT NULL DEFAULT '',
            email      TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS friendships (
            user_id   TEXT NOT NULL,
            friend_id TEXT NOT NULL,
            since     TEXT NOT NULL,
            PRIMARY KEY (user_id, friend_id)
        );

        CREATE TABLE IF NOT EXISTS friend_requests (
            from_id    TEXT NOT NULL,
            to_id      TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (from_id, to_id)
        );

        CREATE INDEX IF NOT EXISTS idx_friend_requests_to ON friend_requests(to_id);",
    )?;
    set_schema_version(&tx, 3)?;
    tx.commit()
}

/// Migration v4: study groups, membership, chat and invitations.
fn migrate_v4(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS study_groups (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            is_private  INTEGER NOT NULL DEFAULT 0,
            invite_code TEXT,
            host_id     TEXT NOT NULL,
            host_name   TEXT NOT NULL DEFAULT '',
            is_active   INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id  TEXT NOT NULL,
            user_id   TEXT NOT NULL,
            joined_at TEXT NOT NULL,
            PRIMARY KEY (group_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS group_messages (
            seq          INTEGER PRIMARY KEY AUTOINCREMENT,
            id           TEXT NOT NULL UNIQUE,
            group_id     TEXT NOT NULL,
            sender_id    TEXT NOT NULL,
            sender_name  TEXT NOT NULL,
            message      TEXT NOT NULL,
            message_type TEXT NOT NULL DEFAULT 'text',
            sent_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_invitations (
            id            TEXT PRIMARY KEY,
            group_id      TEXT NOT NULL,
            group_name    TEXT NOT NULL,
            inviter_id    TEXT NOT NULL,
            inviter_name  TEXT NOT NULL,
            invitee_email TEXT NOT NULL,
            status        TEXT NOT NULL DEFAULT 'pending',
            created_at    TEXT NOT NULL,
            expires_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_group_messages_group ON group_messages(group_id, seq);
        CREATE INDEX IF NOT EXISTS idx_group_invitations_group ON group_invitations(group_id);",
    )?;
    set_schema_version(&tx, 4)?;
    tx.commit()
}

/// Migration v5: profile details on `users`.
///
/// `interests` holds a JSON array of labels.
fn migrate_v5(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "ALTER TABLE users ADD COLUMN education TEXT NOT NULL DEFAULT '';
         ALTER TABLE users ADD COLUMN interests TEXT NOT NULL DEFAULT '[]';",
    )?;
    set_schema_version(&tx, 5)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrates_fresh_database_to_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn v4_database_gains_profile_columns() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        migrate_v2(&conn).unwrap();
        migrate_v3(&conn).unwrap();
        migrate_v4(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (user_id, username, created_at) VALUES ('ann', 'Ann', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();
        let (education, interests): (String, String) = conn
            .query_row("SELECT education, interests FROM users WHERE user_id = 'ann'", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(education, "");
        assert_eq!(interests, "[]");
        assert_eq!(get_schema_version(&conn), 5);
    }
}
