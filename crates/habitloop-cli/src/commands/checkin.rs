use std::cell::Cell;

use chrono::{Duration, Utc};
use clap::Subcommand;
use habitloop_core::{
    Challenge, CheckInFlowController, Config, Database, FlowStep, MilestoneRegistry, Stage,
    StageChoice, TimerSession,
};
use serde_json::json;
use tracing::debug;

/// Longest timed session the CLI will prepare (one day).
const MAX_SESSION_SECS: u64 = 86_400;

#[derive(Subcommand)]
pub enum CheckinAction {
    /// Submit a check-in and walk the completion stages
    Run {
        /// Challenge ID
        #[arg(long)]
        challenge: String,
        /// Day number being completed (1-based)
        #[arg(long)]
        day: u32,
        /// Make this a timed check-in with the given target
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_SESSION_SECS))]
        target_secs: Option<u64>,
        /// Seconds already on the timer (defaults to the full target)
        #[arg(
            long,
            requires = "target_secs",
            value_parser = clap::value_parser!(u64).range(0..=MAX_SESSION_SECS)
        )]
        elapsed_secs: Option<u64>,
        /// Add a reflection note from the success screen
        #[arg(long, conflicts_with = "skip_note")]
        note: Option<String>,
        /// Open the note prompt and skip it
        #[arg(long)]
        skip_note: bool,
    },
}

/// Session with `elapsed_secs` of active time as of now.
fn prepared_timer(target_secs: u64, elapsed_secs: u64) -> Result<TimerSession, String> {
    let now = Utc::now();
    let mut timer = TimerSession::new(target_secs);
    if elapsed_secs > 0 {
        let started = i64::try_from(elapsed_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|elapsed| now.checked_sub_signed(elapsed))
            .ok_or_else(|| format!("elapsed time of {elapsed_secs}s is out of range"))?;
        timer.start(started);
        timer.tick(now);
        timer.pause(now);
    }
    Ok(timer)
}

/// The choice the CLI makes on each stage.
fn choose(stage: Stage, note: Option<&str>, skip_note: bool) -> StageChoice {
    match (stage, note) {
        (Stage::Milestone { .. }, _) => StageChoice::Continue,
        (Stage::Success, Some(_)) => StageChoice::AddNote,
        (Stage::Success, None) if skip_note => StageChoice::AddNote,
        (Stage::Success, None) => StageChoice::Finish,
        (Stage::NotePrompt, Some(text)) => StageChoice::SaveNote(text.to_string()),
        (Stage::NotePrompt, None) => StageChoice::SkipNote,
    }
}

pub fn run(action: CheckinAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CheckinAction::Run {
            challenge,
            day,
            target_secs,
            elapsed_secs,
            note,
            skip_note,
        } => {
            let config = Config::load()?;
            let db = Database::open()?;
            let runtime = tokio::runtime::Builder::new_current_thread().build()?;

            let challenge = match target_secs {
                Some(_) => Challenge::timed(challenge, day),
                None => Challenge::new(challenge, day),
            };
            let timer = target_secs
                .map(|target| prepared_timer(target, elapsed_secs.unwrap_or(target)))
                .transpose()?;

            let refreshed = Cell::new(false);
            let registry = MilestoneRegistry::new(&db, config.milestone_days()?);
            let days = registry.days().clone();
            let mut flow = CheckInFlowController::new(&db, registry, || refreshed.set(true))
                .with_gate(config.checkin.timed_gate);

            let stages = runtime.block_on(async {
                let mut shown = Vec::new();
                let mut step = flow.submit(&challenge, timer.as_ref()).await?;
                while let FlowStep::Presenting(stage) = step {
                    shown.push(stage);
                    let choice = choose(stage, note.as_deref(), skip_note);
                    debug!(stage = stage.name(), choice = choice.name(), "advancing");
                    step = flow.advance(choice).await?;
                }
                let report = flow.flush_pending().await;
                debug!(
                    delivered = report.delivered,
                    failed = report.failed,
                    "milestone writes flushed"
                );
                Ok::<_, habitloop_core::CoreError>(shown)
            })?;
            let events = flow.drain_events();
            drop(flow);

            let days_completed = db.check_ins(&challenge.id)?.len();
            let output = json!({
                "challenge_id": challenge.id,
                "day": challenge.day,
                "stages": stages,
                "events": events,
                "summary": {
                    "refreshed": refreshed.get(),
                    "days_completed": days_completed,
                    "next_milestone": days.next_after(challenge.day),
                },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitloop_core::TimerState;

    #[test]
    fn prepared_timer_carries_elapsed() {
        let timer = prepared_timer(600, 90).unwrap();
        assert_eq!(timer.state(), TimerState::Paused);
        assert_eq!(timer.elapsed_secs(), 90);

        let full = prepared_timer(600, 600).unwrap();
        assert_eq!(full.state(), TimerState::Completed);

        let untouched = prepared_timer(600, 0).unwrap();
        assert_eq!(untouched.state(), TimerState::Idle);
    }

    #[test]
    fn absurd_elapsed_is_an_error() {
        assert!(prepared_timer(600, u64::MAX).is_err());
    }

    #[test]
    fn session_bounds_are_enforced_by_the_parser() {
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(subcommand)]
            action: CheckinAction,
        }

        let parse = |extra: &[&str]| {
            let mut args = vec!["harness", "run", "--challenge", "yoga", "--day", "1"];
            args.extend_from_slice(extra);
            Harness::try_parse_from(args)
        };
        assert!(parse(&["--target-secs", "600", "--elapsed-secs", "60"]).is_ok());
        assert!(parse(&["--target-secs", "0"]).is_err());
        assert!(parse(&["--target-secs", "86401"]).is_err());
        assert!(parse(&["--target-secs", "600", "--elapsed-secs", "9223372036854775807"]).is_err());
    }

    #[test]
    fn note_flag_drives_choices() {
        assert_eq!(choose(Stage::Success, None, false), StageChoice::Finish);
        assert_eq!(choose(Stage::Success, Some("x"), false), StageChoice::AddNote);
        assert_eq!(choose(Stage::Success, None, true), StageChoice::AddNote);
        assert_eq!(choose(Stage::NotePrompt, None, true), StageChoice::SkipNote);
        assert_eq!(
            choose(Stage::NotePrompt, Some("x"), false),
            StageChoice::SaveNote("x".into())
        );
        assert_eq!(
            choose(Stage::Milestone { day: 7 }, None, false),
            StageChoice::Continue
        );
    }
}
