//! Study groups: membership, invite codes, invitations and group chat.
//!
//! Lifecycle events (creation, joins, invitations) are posted into the
//! group's chat as system messages so every member sees them in one stream.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::social::UserProfile;
use crate::storage::database::parse_timestamp;
use crate::storage::Database;

pub const INVITE_CODE_LEN: usize = 6;
pub const INVITATION_TTL_DAYS: i64 = 7;
pub const DEFAULT_MESSAGE_LIMIT: usize = 50;

const SYSTEM_SENDER_ID: &str = "system";
const SYSTEM_SENDER_NAME: &str = "System";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGroup {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_private: bool,
    pub invite_code: Option<String>,
    pub host_id: String,
    pub host_name: String,
    pub members: Vec<String>,
    pub member_count: usize,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    System,
}

impl MessageType {
    fn as_str(self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::System => "system",
        }
    }
}

impl FromStr for MessageType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "system" => Ok(MessageType::System),
            other => Err(ValidationError::invalid("message_type", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub group_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub message: String,
    pub message_type: MessageType,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub group_id: String,
    pub group_name: String,
    pub inviter_id: String,
    pub inviter_name: String,
    pub invitee_email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub trait StudyGroups {
    /// Create a group hosted by `host`, who becomes its first member.
    fn create_group(
        &self,
        name: &str,
        description: &str,
        is_private: bool,
        host: &UserProfile,
    ) -> Result<StudyGroup>;

    /// All active groups, newest first.
    fn list_groups(&self) -> Result<Vec<StudyGroup>>;

    fn group(&self, group_id: &str) -> Result<StudyGroup>;

    fn join_group(&self, group_id: &str, user: &UserProfile, invite_code: Option<&str>) -> Result<StudyGroup>;

    fn invite(&self, group_id: &str, inviter: &UserProfile, invitee_email: &str) -> Result<Invitation>;

    /// Delete a group with its chat and invitations. Host only.
    fn delete_group(&self, group_id: &str, user_id: &str) -> Result<()>;

    fn send_message(&self, group_id: &str, sender: &UserProfile, message: &str) -> Result<ChatMessage>;

    /// The latest `limit` messages in chronological order.
    fn messages(&self, group_id: &str, limit: usize) -> Result<Vec<ChatMessage>>;
}

/// Random upper-case alphanumeric code.
pub fn generate_invite_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_ascii_uppercase()
}

type GroupRow = (String, String, String, bool, Option<String>, String, String, bool, String, String);

impl Database {
    fn group_members(&self, group_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM group_members WHERE group_id = ?1 ORDER BY joined_at, user_id",
        )?;
        let rows = stmt.query_map(params![group_id], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn is_member(&self, group_id: &str, user_id: &str) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                params![group_id, user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn group_from_row(&self, row: GroupRow) -> Result<StudyGroup> {
        let (id, name, description, is_private, invite_code, host_id, host_name, is_active, created_at, updated_at) =
            row;
        let members = self.group_members(&id)?;
        Ok(StudyGroup {
            member_count: members.len(),
            members,
            name,
            description,
            is_private,
            invite_code,
            host_id,
            host_name,
            is_active,
            created_at: parse_timestamp("study_groups.created_at", &created_at)?,
            updated_at: parse_timestamp("study_groups.updated_at", &updated_at)?,
            id,
        })
    }

    fn find_group(&self, group_id: &str) -> Result<Option<StudyGroup>> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, name, description, is_private, invite_code, host_id, host_name,
                        is_active, created_at, updated_at
                 FROM study_groups WHERE id = ?1",
                params![group_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                    ))
                },
            )
            .optional()?;
        row.map(|r| self.group_from_row(r)).transpose()
    }

    fn post(
        &self,
        group_id: &str,
        sender_id: &str,
        sender_name: &str,
        message: &str,
        message_type: MessageType,
    ) -> Result<ChatMessage> {
        let msg = ChatMessage {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            message: message.to_string(),
            message_type,
            sent_at: Utc::now(),
        };
        self.conn().execute(
            "INSERT INTO group_messages (id, group_id, sender_id, sender_name, message, message_type, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                msg.id,
                msg.group_id,
                msg.sender_id,
                msg.sender_name,
                msg.message,
                msg.message_type.as_str(),
                msg.sent_at.to_rfc3339(),
            ],
        )?;
        Ok(msg)
    }

    fn post_system(&self, group_id: &str, message: &str) -> Result<ChatMessage> {
        self.post(group_id, SYSTEM_SENDER_ID, SYSTEM_SENDER_NAME, message, MessageType::System)
    }
}

impl StudyGroups for Database {
    fn create_group(
        &self,
        name: &str,
        description: &str,
        is_private: bool,
        host: &UserProfile,
    ) -> Result<StudyGroup> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty("name".into()).into());
        }
        if host.user_id.trim().is_empty() {
            return Err(ValidationError::Empty("host_id".into()).into());
        }

        let id = Uuid::new_v4().to_string();
        let invite_code = is_private.then(generate_invite_code);
        let now = Utc::now().to_rfc3339();

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO study_groups (id, name, description, is_private, invite_code, host_id,
                                       host_name, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)",
            params![id, name, description.trim(), is_private, invite_code, host.user_id, host.username, now],
        )?;
        tx.execute(
            "INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![id, host.user_id, now],
        )?;
        tx.commit()?;

        self.post_system(&id, &format!("Welcome to {name}! Start your study session."))?;
        info!(group_id = %id, is_private, "study group created");
        self.group(&id)
    }

    fn list_groups(&self) -> Result<Vec<StudyGroup>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, description, is_private, invite_code, host_id, host_name,
                    is_active, created_at, updated_at
             FROM study_groups WHERE is_active = 1
             ORDER BY created_at DESC, id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<GroupRow>>>()?;
        rows.into_iter().map(|r| self.group_from_row(r)).collect()
    }

    fn group(&self, group_id: &str) -> Result<StudyGroup> {
        self.find_group(group_id)?
            .ok_or_else(|| CoreError::not_found("study group", group_id))
    }

    fn join_group(&self, group_id: &str, user: &UserProfile, invite_code: Option<&str>) -> Result<StudyGroup> {
        let group = self.group(group_id)?;
        if group.is_private {
            let supplied = invite_code.map(|c| c.trim().to_ascii_uppercase());
            if supplied.is_none() || supplied != group.invite_code {
                return Err(CoreError::Forbidden("Invalid invite code".into()));
            }
        }
        if group.members.iter().any(|m| m == &user.user_id) {
            return Err(CoreError::Conflict(format!(
                "{} is already a member of {}",
                user.user_id, group.name
            )));
        }

        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![group_id, user.user_id, now],
        )?;
        self.conn().execute(
            "UPDATE study_groups SET updated_at = ?2 WHERE id = ?1",
            params![group_id, now],
        )?;
        self.post_system(group_id, &format!("{} joined the study group!", user.username))?;
        debug!(group_id, user_id = %user.user_id, "joined study group");
        self.group(group_id)
    }

    fn invite(&self, group_id: &str, inviter: &UserProfile, invitee_email: &str) -> Result<Invitation> {
        let email = invitee_email.trim();
        if email.is_empty() {
            return Err(ValidationError::Empty("invitee_email".into()).into());
        }
        if !email.contains('@') {
            return Err(ValidationError::invalid("invitee_email", format!("'{email}' is not an email address")).into());
        }
        let group = self.group(group_id)?;
        if !self.is_member(group_id, &inviter.user_id)? {
            return Err(CoreError::Forbidden(format!(
                "{} is not a member of {}",
                inviter.user_id, group.name
            )));
        }

        let created_at = Utc::now();
        let invitation = Invitation {
            id: Uuid::new_v4().to_string(),
            group_id: group.id.clone(),
            group_name: group.name.clone(),
            inviter_id: inviter.user_id.clone(),
            inviter_name: inviter.username.clone(),
            invitee_email: email.to_string(),
            status: "pending".into(),
            created_at,
            expires_at: created_at + Duration::days(INVITATION_TTL_DAYS),
        };
        self.conn().execute(
            "INSERT INTO group_invitations (id, group_id, group_name, inviter_id, inviter_name,
                                            invitee_email, status, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                invitation.id,
                invitation.group_id,
                invitation.group_name,
                invitation.inviter_id,
                invitation.inviter_name,
                invitation.invitee_email,
                invitation.status,
                invitation.created_at.to_rfc3339(),
                invitation.expires_at.to_rfc3339(),
            ],
        )?;
        self.post_system(
            group_id,
            &format!("{} invited {} to join the group", inviter.username, email),
        )?;
        Ok(invitation)
    }

    fn delete_group(&self, group_id: &str, user_id: &str) -> Result<()> {
        let group = self.group(group_id)?;
        if group.host_id != user_id {
            return Err(CoreError::Forbidden("Only the host can delete the group".into()));
        }
        let tx = self.conn().unchecked_transaction()?;
        tx.execute("DELETE FROM group_messages WHERE group_id = ?1", params![group_id])?;
        tx.execute("DELETE FROM group_invitations WHERE group_id = ?1", params![group_id])?;
        tx.execute("DELETE FROM group_members WHERE group_id = ?1", params![group_id])?;
        tx.execute("DELETE FROM study_groups WHERE id = ?1", params![group_id])?;
        tx.commit()?;
        info!(group_id, "study group deleted");
        Ok(())
    }

    fn send_message(&self, group_id: &str, sender: &UserProfile, message: &str) -> Result<ChatMessage> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::Empty("message".into()).into());
        }
        let group = self.group(group_id)?;
        if !self.is_member(group_id, &sender.user_id)? {
            return Err(CoreError::Forbidden(format!(
                "{} is not a member of {}",
                sender.user_id, group.name
            )));
        }
        self.post(group_id, &sender.user_id, &sender.username, message, MessageType::Text)
    }

    fn messages(&self, group_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        self.group(group_id)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn().prepare(
            "SELECT id, group_id, sender_id, sender_name, message, message_type, sent_at FROM (
                 SELECT * FROM group_messages WHERE group_id = ?1 ORDER BY seq DESC LIMIT ?2
             ) ORDER BY seq ASC",
        )?;
        let rows = stmt
            .query_map(params![group_id, limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut messages = Vec::with_capacity(rows.len());
        for (id, group_id, sender_id, sender_name, message, message_type, sent_at) in rows {
            let message_type = message_type.parse().map_err(|_| DatabaseError::CorruptValue {
                column: "group_messages.message_type".into(),
                value: message_type.clone(),
            })?;
            messages.push(ChatMessage {
                id,
                group_id,
                sender_id,
                sender_name,
                message,
                message_type,
                sent_at: parse_timestamp("group_messages.sent_at", &sent_at)?,
            });
        }
        Ok(messages)
    }
}
