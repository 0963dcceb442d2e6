use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "habitloop-cli", version, about = "habitloop CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timed session tools
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Run the check-in completion flow
    Checkin {
        #[command(subcommand)]
        action: commands::checkin::CheckinAction,
    },
    /// Celebrated milestone bookkeeping
    Milestones {
        #[command(subcommand)]
        action: commands::milestones::MilestonesAction,
    },
    /// Recorded check-ins and notes for a challenge
    History {
        /// Challenge ID
        #[arg(long)]
        challenge: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("HABITLOOP_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Checkin { action } => commands::checkin::run(action),
        Commands::Milestones { action } => commands::milestones::run(action),
        Commands::History { challenge } => commands::history::run(&challenge),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
