use chrono::{Datelike, Local, NaiveDate};
use clap::Subcommand;
use focusflow_core::{month_grid, Config, Database, Priority};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum CalendarAction {
    /// Add an entry on a date (YYYY-MM-DD)
    Add {
        date: NaiveDate,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// low, normal or high
        #[arg(long, default_value = "normal")]
        priority: Priority,
    },
    /// List entries on one day, or for a whole month with --month
    List {
        /// Day to list (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Month to list, as YYYY-MM
        #[arg(long, conflicts_with = "date")]
        month: Option<String>,
    },
    /// Remove an entry
    Remove {
        id: String,
    },
    /// Show the month grid and its entries (YYYY-MM, defaults to this month)
    Month {
        month: Option<String>,
    },
}

fn parse_month(value: Option<&str>) -> Result<(i32, u32), Box<dyn std::error::Error>> {
    let Some(value) = value else {
        let today = Local::now().date_naive();
        return Ok((today.year(), today.month()));
    };
    let (year, month) = value
        .split_once('-')
        .ok_or_else(|| format!("expected YYYY-MM, got '{value}'"))?;
    Ok((year.parse()?, month.parse()?))
}

pub fn run(action: CalendarAction) -> CliResult {
    let config = Config::load()?;
    let user = config.profile.user_id.as_str();
    let db = Database::open()?;

    match action {
        CalendarAction::Add {
            date,
            title,
            description,
            priority,
        } => {
            print_json(&db.add_entry(user, &title, &description, date, priority)?)?;
        }
        CalendarAction::List { date, month } => {
            let entries = match month {
                Some(month) => {
                    let (year, month) = parse_month(Some(&month))?;
                    db.entries_in_month(user, year, month)?
                }
                None => {
                    let date = date.unwrap_or_else(|| Local::now().date_naive());
                    db.entries_on(user, date)?
                }
            };
            print_json(&entries)?;
        }
        CalendarAction::Remove { id } => {
            db.remove_entry(&id)?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
        CalendarAction::Month { month } => {
            let (year, month) = parse_month(month.as_deref())?;
            let grid = month_grid(year, month)?;
            let entries = db.entries_in_month(user, year, month)?;
            print_json(&serde_json::json!({
                "grid": grid,
                "entries": entries,
            }))?;
        }
    }
    Ok(())
}
