//! Friend graph: users, friend requests and symmetric friendships, plus the
//! profile card (education and interests) friends see of each other.
//!
//! The [`SocialGraph`] trait is the seam front-ends talk to; [`Database`]
//! implements it over the `users`, `friend_requests` and `friendships` tables.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::storage::Database;

/// Shown when a user has never set a username.
pub const UNKNOWN_USERNAME: &str = "Unknown User";

/// Default number of suggestions returned.
pub const SUGGESTION_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
}

impl UserProfile {
    fn from_row(user_id: String, username: String) -> Self {
        let username = if username.trim().is_empty() {
            UNKNOWN_USERNAME.to_string()
        } else {
            username
        };
        Self { user_id, username }
    }
}

/// Interests a student can pick for their profile.
pub const INTERESTS: [&str; 9] = [
    "Software Engineering",
    "Cyber Security",
    "Data Analysis",
    "Computer Architecture",
    "Mobile Development",
    "Backend",
    "Frontend",
    "Fullstack",
    "AI/ML",
];

pub const MAX_INTERESTS: usize = 3;

pub const EDUCATION_LEVELS: [&str; 7] = [
    "Undergraduate",
    "Masters Student",
    "Doctoral Student",
    "A.S. Graduate",
    "B.S. Graduate",
    "M.S. Graduate",
    "PhD Graduate",
];

/// What another user sees when opening someone's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDetails {
    pub user_id: String,
    pub username: String,
    pub education: Option<String>,
    pub interests: Vec<String>,
}

fn canonical<'a>(options: &[&'a str], value: &str) -> Option<&'a str> {
    let value = value.trim();
    options.iter().copied().find(|o| o.eq_ignore_ascii_case(value))
}

/// Map user input onto the known interest labels, dropping repeats.
///
/// # Errors
/// Unknown labels and more than [`MAX_INTERESTS`] distinct picks are rejected.
pub fn normalize_interests<S: AsRef<str>>(picks: &[S]) -> Result<Vec<String>> {
    let mut chosen: Vec<String> = Vec::new();
    for pick in picks {
        let label = canonical(&INTERESTS, pick.as_ref()).ok_or_else(|| {
            ValidationError::invalid("interests", format!("unknown interest: {}", pick.as_ref().trim()))
        })?;
        if !chosen.iter().any(|c| c == label) {
            chosen.push(label.to_string());
        }
    }
    if chosen.len() > MAX_INTERESTS {
        return Err(ValidationError::invalid(
            "interests",
            format!("choose at most {MAX_INTERESTS}"),
        )
        .into());
    }
    Ok(chosen)
}

/// `None` or blank clears the level.
pub fn normalize_education(level: Option<&str>) -> Result<Option<String>> {
    match level.map(str::trim).filter(|l| !l.is_empty()) {
        None => Ok(None),
        Some(l) => canonical(&EDUCATION_LEVELS, l)
            .map(|c| Some(c.to_string()))
            .ok_or_else(|| ValidationError::invalid("education", format!("unknown level: {l}")).into()),
    }
}

pub trait SocialGraph {
    /// Create the user if needed and set its username.
    fn ensure_user(&self, user_id: &str, username: &str) -> Result<UserProfile>;

    fn friends(&self, user_id: &str) -> Result<Vec<UserProfile>>;

    /// Send a friend request. Sending the same request twice is a no-op.
    fn send_request(&self, from: &str, to: &str) -> Result<()>;

    /// Users who sent `user_id` a request that is still open.
    fn pending_requests(&self, user_id: &str) -> Result<Vec<UserProfile>>;

    fn accept_request(&self, user_id: &str, requester_id: &str) -> Result<()>;

    fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<()>;

    /// Users who are neither `user_id`, a friend, nor on either side of a
    /// pending request.
    fn suggestions(&self, user_id: &str, limit: usize) -> Result<Vec<UserProfile>>;

    /// Any user's profile card; unknown users are not found.
    fn profile(&self, user_id: &str) -> Result<ProfileDetails>;

    /// Replace the user's interests (at most [`MAX_INTERESTS`]).
    fn set_interests(&self, user_id: &str, interests: &[String]) -> Result<ProfileDetails>;

    fn set_education(&self, user_id: &str, level: Option<&str>) -> Result<ProfileDetails>;
}

impl Database {
    fn user_exists(&self, user_id: &str) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM users WHERE user_id = ?1",
                params![user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn are_friends(&self, a: &str, b: &str) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM friendships WHERE user_id = ?1 AND friend_id = ?2",
                params![a, b],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn query_profiles(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<UserProfile>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok(UserProfile::from_row(row.get(0)?, row.get(1)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn update_user(&self, user_id: &str, sql: &str, value: &str) -> Result<ProfileDetails> {
        let changed = self.conn().execute(sql, params![value, user_id])?;
        if changed == 0 {
            return Err(CoreError::not_found("user", user_id));
        }
        self.profile(user_id)
    }
}

impl SocialGraph for Database {
    fn ensure_user(&self, user_id: &str, username: &str) -> Result<UserProfile> {
        if user_id.trim().is_empty() {
            return Err(ValidationError::Empty("user_id".into()).into());
        }
        self.conn().execute(
            "INSERT INTO users (user_id, username, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET username = excluded.username",
            params![user_id, username.trim(), Utc::now().to_rfc3339()],
        )?;
        Ok(UserProfile::from_row(user_id.to_string(), username.trim().to_string()))
    }

    fn friends(&self, user_id: &str) -> Result<Vec<UserProfile>> {
        self.query_profiles(
            "SELECT u.user_id, u.username
             FROM friendships f JOIN users u ON u.user_id = f.friend_id
             WHERE f.user_id = ?1
             ORDER BY u.username COLLATE NOCASE, u.user_id",
            &[&user_id],
        )
    }

    fn send_request(&self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Err(ValidationError::invalid("to", "cannot send a friend request to yourself").into());
        }
        for id in [from, to] {
            if !self.user_exists(id)? {
                return Err(CoreError::not_found("user", id));
            }
        }
        if self.are_friends(from, to)? {
            return Err(CoreError::Conflict(format!("{from} and {to} are already friends")));
        }
        self.conn().execute(
            "INSERT OR IGNORE INTO friend_requests (from_id, to_id, created_at) VALUES (?1, ?2, ?3)",
            params![from, to, Utc::now().to_rfc3339()],
        )?;
        debug!(from, to, "friend request sent");
        Ok(())
    }

    fn pending_requests(&self, user_id: &str) -> Result<Vec<UserProfile>> {
        self.query_profiles(
            "SELECT u.user_id, u.username
             FROM friend_requests r JOIN users u ON u.user_id = r.from_id
             WHERE r.to_id = ?1
             ORDER BY r.created_at",
            &[&user_id],
        )
    }

    fn accept_request(&self, user_id: &str, requester_id: &str) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        let removed = tx.execute(
            "DELETE FROM friend_requests WHERE from_id = ?1 AND to_id = ?2",
            params![requester_id, user_id],
        )?;
        if removed == 0 {
            return Err(CoreError::not_found(
                "friend request",
                format!("{requester_id} -> {user_id}"),
            ));
        }
        let since = Utc::now().to_rfc3339();
        for (a, b) in [(user_id, requester_id), (requester_id, user_id)] {
            tx.execute(
                "INSERT OR IGNORE INTO friendships (user_id, friend_id, since) VALUES (?1, ?2, ?3)",
                params![a, b, since],
            )?;
        }
        tx.commit()?;
        info!(user_id, requester_id, "friend request accepted");
        Ok(())
    }

    fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<()> {
        self.conn().execute(
            "DELETE FROM friendships
             WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)",
            params![user_id, friend_id],
        )?;
        Ok(())
    }

    fn suggestions(&self, user_id: &str, limit: usize) -> Result<Vec<UserProfile>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_profiles(
            "SELECT u.user_id, u.username FROM users u
             WHERE u.user_id <> ?1
               AND NOT EXISTS (SELECT 1 FROM friendships f
                               WHERE f.user_id = ?1 AND f.friend_id = u.user_id)
               AND NOT EXISTS (SELECT 1 FROM friend_requests r
                               WHERE (r.from_id = ?1 AND r.to_id = u.user_id)
                                  OR (r.from_id = u.user_id AND r.to_id = ?1))
             ORDER BY u.created_at, u.user_id
             LIMIT ?2",
            &[&user_id, &limit],
        )
    }

    fn profile(&self, user_id: &str) -> Result<ProfileDetails> {
        let row = self
            .conn()
            .query_row(
                "SELECT username, education, interests FROM users WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()?;
        let (username, education, interests) =
            row.ok_or_else(|| CoreError::not_found("user", user_id))?;
        let interests: Vec<String> =
            serde_json::from_str(&interests).map_err(|_| DatabaseError::CorruptValue {
                column: "users.interests".into(),
                value: interests.clone(),
            })?;
        let card = UserProfile::from_row(user_id.to_string(), username);
        Ok(ProfileDetails {
            user_id: card.user_id,
            username: card.username,
            education: Some(education).filter(|e| !e.is_empty()),
            interests,
        })
    }

    fn set_interests(&self, user_id: &str, interests: &[String]) -> Result<ProfileDetails> {
        let interests = normalize_interests(interests)?;
        let json = serde_json::to_string(&interests)?;
        debug!(user_id, count = interests.len(), "interests updated");
        self.update_user(user_id, "UPDATE users SET interests = ?1 WHERE user_id = ?2", &json)
    }

    fn set_education(&self, user_id: &str, level: Option<&str>) -> Result<ProfileDetails> {
        let level = normalize_education(level)?.unwrap_or_default();
        self.update_user(user_id, "UPDATE users SET education = ?1 WHERE user_id = ?2", &level)
    }
}
