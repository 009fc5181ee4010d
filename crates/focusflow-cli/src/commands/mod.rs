pub mod assistant;
pub mod calendar;
pub mod config;
pub mod friends;
pub mod group;
pub mod profile;
pub mod settings;
pub mod stats;
pub mod task;
pub mod timer;

use focusflow_core::{Config, Database, SocialGraph, UserProfile};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The configured local profile, registered in the user table so the social
/// and group commands can reference it.
pub fn current_user(config: &Config, db: &Database) -> Result<UserProfile, Box<dyn std::error::Error>> {
    Ok(db.ensure_user(&config.profile.user_id, &config.profile.username)?)
}
