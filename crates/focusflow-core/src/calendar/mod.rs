//! Dated study entries and the month grid used to lay them out.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::storage::database::parse_timestamp;
use crate::storage::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low Priority",
            Priority::Normal => "Normal Priority",
            Priority::High => "High Priority",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(ValidationError::invalid(
                "priority",
                format!("'{other}' (expected low, normal or high)"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

/// Layout of one month in a Sunday-first grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    /// Empty cells before the 1st (weekday of the 1st, Sunday = 0).
    pub leading_blanks: u32,
    pub days_in_month: u32,
}

/// Grid for `year`/`month` (1-12).
pub fn month_grid(year: i32, month: u32) -> Result<MonthGrid, ValidationError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ValidationError::invalid("month", format!("{year}-{month} is not a month")))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| ValidationError::invalid("month", format!("{year}-{month} is out of range")))?;

    Ok(MonthGrid {
        year,
        month,
        leading_blanks: first.weekday().num_days_from_sunday(),
        days_in_month: u32::try_from((next - first).num_days()).unwrap_or(31),
    })
}

type EntryRow = (String, String, String, String, String, String, String);

fn entry_from_row(row: EntryRow) -> Result<CalendarEntry> {
    let (id, user_id, title, description, date, priority, created_at) = row;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
        DatabaseError::CorruptValue {
            column: "calendar_entries.date".into(),
            value: date.clone(),
        }
    })?;
    let priority = priority.parse().map_err(|_| DatabaseError::CorruptValue {
        column: "calendar_entries.priority".into(),
        value: priority.clone(),
    })?;
    Ok(CalendarEntry {
        id,
        user_id,
        title,
        description,
        date,
        priority,
        created_at: parse_timestamp("calendar_entries.created_at", &created_at)?,
    })
}

impl Database {
    /// Add an entry. The title is required; title and description are trimmed.
    pub fn add_entry(
        &self,
        user_id: &str,
        title: &str,
        description: &str,
        date: NaiveDate,
        priority: Priority,
    ) -> Result<CalendarEntry> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::Empty("title".into()).into());
        }
        let entry = CalendarEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: description.trim().to_string(),
            date,
            priority,
            created_at: Utc::now(),
        };
        self.conn().execute(
            "INSERT INTO calendar_entries (id, user_id, title, description, date, priority, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.user_id,
                entry.title,
                entry.description,
                entry.date.format("%Y-%m-%d").to_string(),
                entry.priority.as_str(),
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(entry)
    }

    pub fn entries_on(&self, user_id: &str, date: NaiveDate) -> Result<Vec<CalendarEntry>> {
        self.entries_between(user_id, date, date)
    }

    pub fn entries_in_month(&self, user_id: &str, year: i32, month: u32) -> Result<Vec<CalendarEntry>> {
        let grid = month_grid(year, month)?;
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| CoreError::Custom(format!("invalid month {year}-{month}")))?;
        let last = NaiveDate::from_ymd_opt(year, month, grid.days_in_month)
            .ok_or_else(|| CoreError::Custom(format!("invalid month {year}-{month}")))?;
        self.entries_between(user_id, first, last)
    }

    fn entries_between(&self, user_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<CalendarEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, title, description, date, priority, created_at
             FROM calendar_entries
             WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC, created_at ASC",
        )?;
        let rows = stmt.query_map(
            params![
                user_id,
                from.format("%Y-%m-%d").to_string(),
                to.format("%Y-%m-%d").to_string()
            ],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            },
        )?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(entry_from_row(row?)?);
        }
        Ok(entries)
    }

    pub fn remove_entry(&self, id: &str) -> Result<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM calendar_entries WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(CoreError::not_found("calendar entry", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_grid_known_months() {
        // 1 March 2024 was a Friday.
        let march = month_grid(2024, 3).unwrap();
        assert_eq!(march.leading_blanks, 5);
        assert_eq!(march.days_in_month, 31);

        let feb = month_grid(2024, 2).unwrap();
        assert_eq!(feb.days_in_month, 29);
        assert_eq!(month_grid(2023, 2).unwrap().days_in_month, 28);

        // 1 September 2024 was a Sunday.
        assert_eq!(month_grid(2024, 9).unwrap().leading_blanks, 0);
        assert_eq!(month_grid(2024, 12).unwrap().days_in_month, 31);
    }

    #[test]
    fn month_grid_rejects_bad_month() {
        assert!(month_grid(2024, 0).is_err());
        assert!(month_grid(2024, 13).is_err());
    }

    #[test]
    fn add_and_query_entries() {
        let db = Database::open_memory().unwrap();
        db.add_entry("u", " Exam ", "chapters 1-4", date(2024, 3, 14), Priority::High)
            .unwrap();
        db.add_entry("u", "Lab report", "", date(2024, 3, 31), Priority::Normal)
            .unwrap();
        db.add_entry("u", "Essay", "", date(2024, 4, 1), Priority::Low)
            .unwrap();
        db.add_entry("other", "Not mine", "", date(2024, 3, 14), Priority::Low)
            .unwrap();

        let on_day = db.entries_on("u", date(2024, 3, 14)).unwrap();
        assert_eq!(on_day.len(), 1);
        assert_eq!(on_day[0].title, "Exam");
        assert_eq!(on_day[0].priority, Priority::High);

        let march = db.entries_in_month("u", 2024, 3).unwrap();
        let titles: Vec<_> = march.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Exam", "Lab report"]);
    }

    #[test]
    fn title_is_required() {
        let db = Database::open_memory().unwrap();
        let err = db
            .add_entry("u", "  ", "desc", date(2024, 3, 1), Priority::Normal)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn remove_entry_and_unknown_id() {
        let db = Database::open_memory().unwrap();
        let e = db
            .add_entry("u", "Exam", "", date(2024, 3, 1), Priority::Normal)
            .unwrap();
        db.remove_entry(&e.id).unwrap();
        assert!(db.entries_on("u", date(2024, 3, 1)).unwrap().is_empty());
        assert!(matches!(
            db.remove_entry(&e.id).unwrap_err(),
            CoreError::NotFound { .. }
        ));
    }

    #[test]
    fn priority_parsing_and_labels() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::default().label(), "Normal Priority");
    }
}
