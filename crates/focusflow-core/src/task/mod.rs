//! Per-user to-do list shown next to the timer.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, Result, ValidationError};
use crate::storage::database::parse_timestamp;
use crate::storage::Database;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Build a task from raw input. Text is trimmed and must not be empty.
    pub fn new(user_id: &str, text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty("text".into()));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            completed: false,
            created_at: Utc::now(),
        })
    }
}

impl Database {
    pub fn add_task(&self, user_id: &str, text: &str) -> Result<Task> {
        let task = Task::new(user_id, text)?;
        self.conn().execute(
            "INSERT INTO tasks (id, user_id, text, completed, created_at, seq)
             VALUES (?1, ?2, ?3, 0, ?4, (SELECT COALESCE(MAX(seq), 0) + 1 FROM tasks))",
            params![task.id, task.user_id, task.text, task.created_at.to_rfc3339()],
        )?;
        debug!(id = %task.id, "task added");
        Ok(task)
    }

    /// Tasks for `user_id` in creation order.
    pub fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, text, completed, created_at
             FROM tasks WHERE user_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut tasks = Vec::new();
        for row in rows {
            let (id, user_id, text, completed, created_at) = row?;
            tasks.push(Task {
                id,
                user_id,
                text,
                completed,
                created_at: parse_timestamp("tasks.created_at", &created_at)?,
            });
        }
        Ok(tasks)
    }

    /// Flip the completed flag and return the updated task.
    pub fn toggle_task(&self, id: &str) -> Result<Task> {
        let changed = self.conn().execute(
            "UPDATE tasks SET completed = NOT completed WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("task", id));
        }
        self.task(id)?.ok_or_else(|| CoreError::not_found("task", id))
    }

    pub fn delete_task(&self, id: &str) -> Result<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(CoreError::not_found("task", id));
        }
        Ok(())
    }

    fn task(&self, id: &str) -> Result<Option<Task>> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, user_id, text, completed, created_at FROM tasks WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        match row {
            Some((id, user_id, text, completed, created_at)) => Ok(Some(Task {
                id,
                user_id,
                text,
                completed,
                created_at: parse_timestamp("tasks.created_at", &created_at)?,
            })),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_trims_and_lists_in_order() {
        let db = Database::open_memory().unwrap();
        db.add_task("u", "  read chapter 3 ").unwrap();
        db.add_task("u", "flashcards").unwrap();
        db.add_task("other", "not mine").unwrap();
        let texts: Vec<_> = db
            .list_tasks("u")
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["read chapter 3", "flashcards"]);
    }

    #[test]
    fn blank_text_is_rejected() {
        let db = Database::open_memory().unwrap();
        let err = db.add_task("u", "   ").unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Empty(_))));
        assert!(db.list_tasks("u").unwrap().is_empty());
    }

    #[test]
    fn toggle_flips_completed() {
        let db = Database::open_memory().unwrap();
        let task = db.add_task("u", "essay").unwrap();
        assert!(db.toggle_task(&task.id).unwrap().completed);
        assert!(!db.toggle_task(&task.id).unwrap().completed);
    }

    #[test]
    fn delete_removes_task() {
        let db = Database::open_memory().unwrap();
        let task = db.add_task("u", "essay").unwrap();
        db.delete_task(&task.id).unwrap();
        assert!(db.list_tasks("u").unwrap().is_empty());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.toggle_task("nope").unwrap_err(),
            CoreError::NotFound { kind: "task", .. }
        ));
        assert!(matches!(
            db.delete_task("nope").unwrap_err(),
            CoreError::NotFound { .. }
        ));
    }
}
