use serde::{Deserialize, Serialize};

use crate::timer::TimerSession;

/// What is being checked in: a challenge on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    /// 1-based day number being completed.
    pub day: u32,
    /// Timed challenges need timer progress before check-in.
    #[serde(default)]
    pub requires_timer: bool,
}

impl Challenge {
    pub fn new(id: impl Into<String>, day: u32) -> Self {
        Self {
            id: id.into(),
            day,
            requires_timer: false,
        }
    }

    pub fn timed(id: impl Into<String>, day: u32) -> Self {
        Self {
            requires_timer: true,
            ..Self::new(id, day)
        }
    }
}

/// Rule deciding whether a timer admits a timed check-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimedGate {
    /// Completed, or any elapsed time at all.
    #[default]
    CompletedOrStarted,
    /// Only a completed session counts.
    CompletedOnly,
}

impl TimedGate {
    pub fn admits(&self, timer: Option<&TimerSession>) -> bool {
        let Some(timer) = timer else {
            return false;
        };
        match self {
            TimedGate::CompletedOrStarted => timer.is_completed() || timer.has_progress(),
            TimedGate::CompletedOnly => timer.is_completed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn missing_timer_is_never_admitted() {
        assert!(!TimedGate::CompletedOrStarted.admits(None));
        assert!(!TimedGate::CompletedOnly.admits(None));
    }

    #[test]
    fn partial_session_depends_on_gate() {
        let now = Utc::now();
        let mut timer = TimerSession::new(600);
        assert!(!TimedGate::CompletedOrStarted.admits(Some(&timer)));

        timer.start(now);
        timer.pause(now + Duration::seconds(5));
        assert!(TimedGate::CompletedOrStarted.admits(Some(&timer)));
        assert!(!TimedGate::CompletedOnly.admits(Some(&timer)));

        timer.complete(now + Duration::seconds(6));
        assert!(TimedGate::CompletedOnly.admits(Some(&timer)));
    }
}
