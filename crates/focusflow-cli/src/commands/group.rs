use clap::Subcommand;
use focusflow_core::groups::DEFAULT_MESSAGE_LIMIT;
use focusflow_core::{Config, Database, StudyGroups};

use super::{current_user, print_json, CliResult};

#[derive(Subcommand)]
pub enum GroupAction {
    /// Create a study group hosted by you
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Require an invite code to join
        #[arg(long)]
        private: bool,
    },
    /// List active groups
    List,
    /// Join a group
    Join {
        group_id: String,
        /// Invite code for private groups
        #[arg(long)]
        code: Option<String>,
    },
    /// Invite someone by email
    Invite {
        group_id: String,
        email: String,
    },
    /// Delete a group you host
    Delete {
        group_id: String,
    },
    /// Post a chat message
    Send {
        group_id: String,
        message: String,
    },
    /// Latest chat messages, oldest first
    Messages {
        group_id: String,
        #[arg(long, default_value_t = DEFAULT_MESSAGE_LIMIT)]
        limit: usize,
    },
}

pub fn run(action: GroupAction) -> CliResult {
    let config = Config::load()?;
    let db = Database::open()?;
    let me = current_user(&config, &db)?;

    match action {
        GroupAction::Create {
            name,
            description,
            private,
        } => print_json(&db.create_group(&name, &description, private, &me)?)?,
        GroupAction::List => print_json(&db.list_groups()?)?,
        GroupAction::Join { group_id, code } => {
            print_json(&db.join_group(&group_id, &me, code.as_deref())?)?;
        }
        GroupAction::Invite { group_id, email } => {
            print_json(&db.invite(&group_id, &me, &email)?)?;
        }
        GroupAction::Delete { group_id } => {
            db.delete_group(&group_id, &me.user_id)?;
            print_json(&serde_json::json!({ "deleted": group_id }))?;
        }
        GroupAction::Send { group_id, message } => {
            print_json(&db.send_message(&group_id, &me, &message)?)?;
        }
        GroupAction::Messages { group_id, limit } => {
            print_json(&db.messages(&group_id, limit)?)?;
        }
    }
    Ok(())
}
