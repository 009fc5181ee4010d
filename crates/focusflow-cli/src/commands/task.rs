use clap::Subcommand;
use focusflow_core::{Config, Database};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task text
        text: String,
    },
    /// List tasks in creation order
    List,
    /// Mark a task done, or not done again
    Toggle {
        id: String,
    },
    /// Delete a task
    Delete {
        id: String,
    },
}

pub fn run(action: TaskAction) -> CliResult {
    let config = Config::load()?;
    let user = config.profile.user_id.as_str();
    let db = Database::open()?;

    match action {
        TaskAction::Add { text } => print_json(&db.add_task(user, &text)?)?,
        TaskAction::List => print_json(&db.list_tasks(user)?)?,
        TaskAction::Toggle { id } => print_json(&db.toggle_task(&id)?)?,
        TaskAction::Delete { id } => {
            db.delete_task(&id)?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
    }
    Ok(())
}
