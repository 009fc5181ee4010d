use clap::Subcommand;
use focusflow_core::social::{EDUCATION_LEVELS, INTERESTS, MAX_INTERESTS};
use focusflow_core::{Config, Database, SocialGraph};

use super::{current_user, print_json, CliResult};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show a profile card (yours when no user is given)
    View {
        user_id: Option<String>,
    },
    /// Replace your interests (up to 3)
    Interests {
        interests: Vec<String>,
    },
    /// Set your education level; omit it to clear
    Education {
        level: Option<String>,
    },
    /// Interests and education levels to choose from
    Options,
}

pub fn run(action: ProfileAction) -> CliResult {
    let config = Config::load()?;
    let db = Database::open()?;
    let me = current_user(&config, &db)?;

    match action {
        ProfileAction::View { user_id } => {
            let id = user_id.unwrap_or(me.user_id);
            print_json(&db.profile(&id)?)?;
        }
        ProfileAction::Interests { interests } => {
            print_json(&db.set_interests(&me.user_id, &interests)?)?;
        }
        ProfileAction::Education { level } => {
            print_json(&db.set_education(&me.user_id, level.as_deref())?)?;
        }
        ProfileAction::Options => print_json(&serde_json::json!({
            "interests": INTERESTS,
            "max_interests": MAX_INTERESTS,
            "education_levels": EDUCATION_LEVELS,
        }))?,
    }
    Ok(())
}
