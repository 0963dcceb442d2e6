use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flow::Stage;
use crate::timer::TimerState;

/// Every state change in the pipeline produces an Event.
/// The presentation layer drains them to drive sounds, haptics and screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        target_ms: u64,
        elapsed_ms: u64,
        /// True when continuing from Paused.
        resumed: bool,
        at: DateTime<Utc>,
    },
    TimerPaused {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// Emitted exactly once per session; the completion cue hangs off this.
    TimerCompleted {
        target_ms: u64,
        at: DateTime<Utc>,
    },
    TimerBackgrounded {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerForegrounded {
        away_ms: u64,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerSnapshot {
        state: TimerState,
        target_ms: u64,
        elapsed_ms: u64,
        remaining_ms: u64,
        progress: f64,
        backgrounded: bool,
        at: DateTime<Utc>,
    },
    CheckInSubmitted {
        flow_id: Uuid,
        challenge_id: String,
        day: u32,
        duration_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    CheckInRejected {
        flow_id: Uuid,
        challenge_id: String,
        reason: String,
        at: DateTime<Utc>,
    },
    MilestonesSynced {
        challenge_id: String,
        remote_days: Vec<u32>,
        /// Remote fetch failed; only local knowledge is in effect.
        degraded: bool,
        at: DateTime<Utc>,
    },
    MilestoneCelebrated {
        challenge_id: String,
        day: u32,
        at: DateTime<Utc>,
    },
    StagePresented {
        flow_id: Uuid,
        index: usize,
        stage: Stage,
        at: DateTime<Utc>,
    },
    NoteSaved {
        flow_id: Uuid,
        challenge_id: String,
        day: u32,
        at: DateTime<Utc>,
    },
    FlowClosed {
        flow_id: Uuid,
        challenge_id: Option<String>,
        /// Whether the challenge summary reload was issued.
        refreshed: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short snake_case name, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerReset { .. } => "timer_reset",
            Event::TimerCompleted { .. } => "timer_completed",
            Event::TimerBackgrounded { .. } => "timer_backgrounded",
            Event::TimerForegrounded { .. } => "timer_foregrounded",
            Event::TimerSnapshot { .. } => "timer_snapshot",
            Event::CheckInSubmitted { .. } => "check_in_submitted",
            Event::CheckInRejected { .. } => "check_in_rejected",
            Event::MilestonesSynced { .. } => "milestones_synced",
            Event::MilestoneCelebrated { .. } => "milestone_celebrated",
            Event::StagePresented { .. } => "stage_presented",
            Event::NoteSaved { .. } => "note_saved",
            Event::FlowClosed { .. } => "flow_closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::MilestoneCelebrated {
            challenge_id: "run-5k".into(),
            day: 30,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MilestoneCelebrated");
        assert_eq!(json["day"], 30);
        assert_eq!(event.kind(), "milestone_celebrated");
    }
}
