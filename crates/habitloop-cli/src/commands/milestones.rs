use clap::Subcommand;
use habitloop_core::{Config, Database};
use serde_json::json;

#[derive(Subcommand)]
pub enum MilestonesAction {
    /// Show celebrated milestones for a challenge
    List {
        /// Challenge ID
        #[arg(long)]
        challenge: String,
    },
    /// Forget celebrated milestones so they show again
    Reset {
        /// Challenge ID
        #[arg(long)]
        challenge: String,
    },
    /// Print the next milestone day after the given day
    Next {
        /// Current day number
        #[arg(long)]
        day: u32,
    },
}

pub fn run(action: MilestonesAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        MilestonesAction::List { challenge } => {
            let days = Config::load()?.milestone_days()?;
            let db = Database::open()?;
            let seen = db.seen_milestones(&challenge)?;
            let upcoming = days.iter().find(|day| !seen.contains(day));
            let output = json!({
                "challenge_id": challenge,
                "seen": seen,
                "milestone_days": days.iter().collect::<Vec<_>>(),
                "next_unseen": upcoming,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        MilestonesAction::Reset { challenge } => {
            let db = Database::open()?;
            let removed = db.reset_milestones(&challenge)?;
            println!("cleared {removed} milestone(s) for {challenge}");
        }
        MilestonesAction::Next { day } => {
            let days = Config::load()?.milestone_days()?;
            match days.next_after(day) {
                Some(next) => println!("{next}"),
                None => println!("none"),
            }
        }
    }
    Ok(())
}
