use chrono::Utc;
use clap::Subcommand;
use focusflow_core::{Analytics, Database, Period, SessionLog};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals for a period
    Summary {
        /// week, month or all
        #[arg(long, default_value = "week")]
        period: Period,
    },
    /// Study minutes for each of the last 7 days
    Daily,
    /// Most recent sessions in a period (last 7 days by default), newest first
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// week, month or all
        #[arg(long, default_value = "week")]
        period: Period,
    },
}

pub fn run(action: StatsAction) -> CliResult {
    let db = Database::open()?;
    let analytics = Analytics::over(db.sessions()?, Utc::now());

    match action {
        StatsAction::Summary { period } => print_json(&analytics.for_period(period).summary())?,
        StatsAction::Daily => print_json(&analytics.daily())?,
        StatsAction::Recent { limit, period } => {
            print_json(&analytics.for_period(period).recent(limit))?;
        }
    }
    Ok(())
}
