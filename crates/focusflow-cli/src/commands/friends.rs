use clap::Subcommand;
use focusflow_core::social::SUGGESTION_LIMIT;
use focusflow_core::{Config, Database, SocialGraph};

use super::{current_user, print_json, CliResult};

#[derive(Subcommand)]
pub enum FriendsAction {
    /// List friends
    List,
    /// Send a friend request
    Request {
        user_id: String,
    },
    /// Incoming friend requests
    Pending,
    /// Accept a request from a user
    Accept {
        user_id: String,
    },
    /// Remove a friend
    Remove {
        user_id: String,
    },
    /// People you might know
    Suggest {
        #[arg(long, default_value_t = SUGGESTION_LIMIT)]
        limit: usize,
    },
    /// Register another user (or rename one) so they can be befriended
    Register {
        user_id: String,
        username: String,
    },
}

pub fn run(action: FriendsAction) -> CliResult {
    let config = Config::load()?;
    let db = Database::open()?;
    let me = current_user(&config, &db)?;

    match action {
        FriendsAction::List => print_json(&db.friends(&me.user_id)?)?,
        FriendsAction::Request { user_id } => {
            db.send_request(&me.user_id, &user_id)?;
            print_json(&serde_json::json!({ "requested": user_id }))?;
        }
        FriendsAction::Pending => print_json(&db.pending_requests(&me.user_id)?)?,
        FriendsAction::Accept { user_id } => {
            db.accept_request(&me.user_id, &user_id)?;
            print_json(&db.friends(&me.user_id)?)?;
        }
        FriendsAction::Remove { user_id } => {
            db.remove_friend(&me.user_id, &user_id)?;
            print_json(&serde_json::json!({ "removed": user_id }))?;
        }
        FriendsAction::Suggest { limit } => print_json(&db.suggestions(&me.user_id, limit)?)?,
        FriendsAction::Register { user_id, username } => {
            print_json(&db.ensure_user(&user_id, &username)?)?;
        }
    }
    Ok(())
}
