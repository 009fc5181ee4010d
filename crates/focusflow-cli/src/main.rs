use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusflow", version, about = "FocusFlow study timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pomodoro timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Study settings (durations, theme, sound)
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// To-do list
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Dated study entries
    Calendar {
        #[command(subcommand)]
        action: commands::calendar::CalendarAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Friends and friend requests
    Friends {
        #[command(subcommand)]
        action: commands::friends::FriendsAction,
    },
    /// Education and interests shown to friends
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Study groups and group chat
    Group {
        #[command(subcommand)]
        action: commands::group::GroupAction,
    },
    /// AI study assistant
    Assistant {
        #[command(subcommand)]
        action: commands::assistant::AssistantAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

/// Log to stderr so JSON on stdout stays parseable. `FOCUSFLOW_LOG` takes
/// an `EnvFilter` directive; the default is `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("FOCUSFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Calendar { action } => commands::calendar::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Friends { action } => commands::friends::run(action),
        Commands::Profile { action } => commands::profile::run(action),
        Commands::Group { action } => commands::group::run(action),
        Commands::Assistant { action } => commands::assistant::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "focusflow", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
