use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use habitloop_core::{Config, Event, TimerSession, TimerState};

/// Scripts cover at most a week.
const MAX_SCRIPT_SECS: f64 = 604_800.0;
/// Longest target the simulator accepts (one day).
const MAX_TARGET_SECS: u64 = 86_400;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Replay a scripted session and print every event as JSON
    Simulate {
        /// Target duration in seconds (defaults to timer.default_target_secs)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_TARGET_SECS))]
        target_secs: Option<u64>,
        /// Space separated `action@seconds` steps, e.g.
        /// "start@0 background@60 foreground@300 tick@600".
        /// Actions: start, pause, reset, tick, background, foreground, complete.
        /// While running in the foreground the session is also ticked every
        /// timer.tick_interval_ms.
        #[arg(long)]
        script: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepAction {
    Start,
    Pause,
    Reset,
    Tick,
    Background,
    Foreground,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScriptStep {
    action: StepAction,
    at_ms: u64,
}

fn parse_script(script: &str) -> Result<Vec<ScriptStep>, String> {
    let mut steps = Vec::new();
    let mut last_ms = 0;
    for token in script.split_whitespace() {
        let (name, at) = token
            .split_once('@')
            .ok_or_else(|| format!("step '{token}' must look like action@seconds"))?;
        let action = match name {
            "start" => StepAction::Start,
            "pause" => StepAction::Pause,
            "reset" => StepAction::Reset,
            "tick" => StepAction::Tick,
            "background" => StepAction::Background,
            "foreground" => StepAction::Foreground,
            "complete" => StepAction::Complete,
            other => return Err(format!("unknown timer action '{other}'")),
        };
        let secs: f64 = at
            .parse()
            .map_err(|_| format!("bad offset '{at}' in step '{token}'"))?;
        if !(0.0..=MAX_SCRIPT_SECS).contains(&secs) {
            return Err(format!(
                "offset in step '{token}' must be between 0 and {MAX_SCRIPT_SECS} seconds"
            ));
        }
        let at_ms = (secs * 1000.0).round() as u64;
        if at_ms < last_ms {
            return Err(format!("step '{token}' goes back in time"));
        }
        last_ms = at_ms;
        steps.push(ScriptStep { action, at_ms });
    }
    if steps.is_empty() {
        return Err("script is empty".into());
    }
    Ok(steps)
}

fn at(origin: DateTime<Utc>, ms: u64) -> DateTime<Utc> {
    origin + Duration::milliseconds(ms as i64)
}

fn apply(session: &mut TimerSession, step: ScriptStep, origin: DateTime<Utc>) -> Option<Event> {
    let now = at(origin, step.at_ms);
    match step.action {
        StepAction::Start => session.start(now),
        StepAction::Pause => session.pause(now),
        StepAction::Reset => session.reset(now),
        StepAction::Tick => session.tick(now),
        StepAction::Background => session.on_backgrounded(now),
        StepAction::Foreground => session.on_foregrounded(now),
        StepAction::Complete => session.complete(now),
    }
}

/// Run the script, ticking the session every `tick_interval_ms` while it
/// runs in the foreground, the way an app's periodic callback would.
fn replay(
    session: &mut TimerSession,
    steps: &[ScriptStep],
    origin: DateTime<Utc>,
    tick_interval_ms: u64,
) -> Vec<Event> {
    let mut events = Vec::new();
    let mut clock_ms = 0;
    for step in steps {
        while session.state() == TimerState::Running && !session.is_backgrounded() {
            let next = clock_ms + tick_interval_ms;
            if next >= step.at_ms {
                break;
            }
            clock_ms = next;
            events.extend(session.tick(at(origin, clock_ms)));
        }
        clock_ms = step.at_ms;
        events.extend(apply(session, *step, origin));
    }
    events
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Simulate { target_secs, script } => {
            let config = Config::load()?;
            let target_secs = target_secs.unwrap_or(config.timer.default_target_secs);
            let steps = parse_script(&script)?;
            let origin = Utc::now();
            let mut session = TimerSession::new(target_secs);

            let mut events = replay(&mut session, &steps, origin, config.timer.tick_interval_ms);
            let last_ms = steps.last().map(|s| s.at_ms).unwrap_or(0);
            events.push(session.snapshot(at(origin, last_ms)));
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
    }
    Ok(())
}
