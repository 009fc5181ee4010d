use clap::Subcommand;
use focusflow_core::storage::ColorTheme;
use focusflow_core::{Config, Database, Settings};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Get a setting (e.g. "pomodoro_duration", "color_theme")
    Get {
        key: String,
    },
    /// Set a setting; durations are minutes, volume is a percentage
    Set {
        key: String,
        value: String,
    },
    /// List all settings
    List,
    /// Reset settings to defaults
    Reset,
    /// Show the colors of the active theme, or of every theme with --all
    Theme {
        #[arg(long)]
        all: bool,
    },
}

/// An idle timer picks up new durations right away; a running countdown
/// keeps the length it started with.
fn refresh_idle_timer(db: &Database, settings: &Settings) -> CliResult {
    if let Some(mut state) = db.load_timer_state()? {
        if !state.running {
            state.remaining_secs = settings.mode_durations().secs(state.mode);
            db.save_timer_state(&state)?;
        }
    }
    Ok(())
}

pub fn run(action: SettingsAction) -> CliResult {
    let config = Config::load()?;
    let user = config.profile.user_id.as_str();
    let db = Database::open()?;

    match action {
        SettingsAction::Get { key } => {
            let settings = db.load_settings(user)?;
            match settings.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        SettingsAction::Set { key, value } => {
            let mut settings = db.load_settings(user)?;
            settings.set(&key, &value)?;
            db.save_settings(user, &settings)?;
            refresh_idle_timer(&db, &settings)?;
            print_json(&settings)?;
        }
        SettingsAction::List => {
            print_json(&db.load_settings(user)?)?;
        }
        SettingsAction::Reset => {
            let settings = db.reset_settings(user)?;
            refresh_idle_timer(&db, &settings)?;
            print_json(&settings)?;
        }
        SettingsAction::Theme { all } => {
            if all {
                let palettes: Vec<_> = [
                    ColorTheme::Blue,
                    ColorTheme::Green,
                    ColorTheme::Purple,
                    ColorTheme::Orange,
                ]
                .into_iter()
                .map(ColorTheme::palette)
                .collect();
                print_json(&palettes)?;
            } else {
                print_json(&db.load_settings(user)?.theme())?;
            }
        }
    }
    Ok(())
}
