//! Check-in completion flow.
//!
//! ```text
//! AwaitingSubmission -> PresentingStage(0) -> PresentingStage(n) -> Closed
//! ```
//!
//! The controller owns the milestone registry for the duration of the flow
//! and borrows the timer only to gate submission. Each async call is a
//! suspend point: state is updated only after the awaited result is back,
//! so dropping a future mid-flight leaves the controller where it was.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::gate::{Challenge, TimedGate};
use super::stage::{build_stages, stage_action, Stage, StageAction, StageChoice};
use crate::error::{FlowError, Result, ValidationError};
use crate::events::Event;
use crate::milestone::{FlushReport, MilestoneRegistry, SyncOutcome};
use crate::remote::{CheckInSubmitter, MilestoneStore, SummaryRefresher};
use crate::timer::TimerSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    AwaitingSubmission,
    PresentingStage(usize),
    Closed,
}

/// What the presentation layer should show after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    Presenting(Stage),
    Closed,
}

pub struct CheckInFlowController<B, M, R> {
    flow_id: Uuid,
    backend: B,
    registry: MilestoneRegistry<M>,
    refresher: R,
    gate: TimedGate,
    state: FlowState,
    stages: Vec<Stage>,
    challenge: Option<Challenge>,
    events: Vec<Event>,
}

impl<B, M, R> CheckInFlowController<B, M, R>
where
    B: CheckInSubmitter,
    M: MilestoneStore,
    R: SummaryRefresher,
{
    pub fn new(backend: B, registry: MilestoneRegistry<M>, refresher: R) -> Self {
        Self {
            flow_id: Uuid::new_v4(),
            backend,
            registry,
            refresher,
            gate: TimedGate::default(),
            state: FlowState::AwaitingSubmission,
            stages: Vec::new(),
            challenge: None,
            events: Vec::new(),
        }
    }

    pub fn with_gate(mut self, gate: TimedGate) -> Self {
        self.gate = gate;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn current_stage(&self) -> Option<Stage> {
        match self.state {
            FlowState::PresentingStage(index) => self.stages.get(index).copied(),
            _ => None,
        }
    }

    pub fn registry(&self) -> &MilestoneRegistry<M> {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Hand the registry back so its cache outlives this flow.
    pub fn into_registry(self) -> MilestoneRegistry<M> {
        self.registry
    }

    /// Deliver milestone writes queued by presented stages.
    ///
    /// Never awaited by the flow itself. The caller drives it alongside the
    /// stages (or after closing) and may drop it at any point; undelivered
    /// writes stay queued.
    pub async fn flush_pending(&mut self) -> FlushReport {
        self.registry.flush_pending().await
    }

    /// Events produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Warm the milestone cache when the check-in screen opens.
    pub async fn prepare(&mut self, challenge_id: &str) {
        if let Some(outcome) = self.registry.ensure_synced(challenge_id).await {
            self.record_sync(challenge_id, outcome);
        }
    }

    /// Submit the check-in. On success the first stage is presented.
    ///
    /// Rejections (timer gate, collaborator failure) leave the controller in
    /// `AwaitingSubmission` so the user can retry.
    pub async fn submit(
        &mut self,
        challenge: &Challenge,
        timer: Option<&TimerSession>,
    ) -> Result<FlowStep> {
        match self.state {
            FlowState::AwaitingSubmission => {}
            FlowState::PresentingStage(_) => return Err(FlowError::AlreadySubmitted.into()),
            FlowState::Closed => return Err(FlowError::Closed.into()),
        }
        if challenge.day == 0 {
            return Err(ValidationError::InvalidDay {
                challenge_id: challenge.id.clone(),
                day: challenge.day,
            }
            .into());
        }
        if challenge.requires_timer && !self.gate.admits(timer) {
            let err = ValidationError::TimedSessionIncomplete {
                challenge_id: challenge.id.clone(),
            };
            self.reject(challenge, err.to_string());
            return Err(err.into());
        }

        let duration_secs = if challenge.requires_timer {
            timer.map(TimerSession::elapsed_secs)
        } else {
            None
        };
        if let Err(err) = self
            .backend
            .submit_check_in(&challenge.id, challenge.day, duration_secs)
            .await
        {
            self.reject(challenge, err.to_string());
            return Err(err.into());
        }
        info!(
            flow_id = %self.flow_id,
            challenge_id = %challenge.id,
            day = challenge.day,
            ?duration_secs,
            "check-in submitted"
        );
        self.events.push(Event::CheckInSubmitted {
            flow_id: self.flow_id,
            challenge_id: challenge.id.clone(),
            day: challenge.day,
            duration_secs,
            at: Utc::now(),
        });

        self.prepare(&challenge.id).await;
        let celebrate = self.registry.should_show(&challenge.id, challenge.day);
        self.stages = build_stages(celebrate.then_some(challenge.day));
        self.challenge = Some(challenge.clone());
        Ok(self.present(0))
    }

    /// Apply the user's choice on the current stage.
    pub async fn advance(&mut self, choice: StageChoice) -> Result<FlowStep> {
        let index = match self.state {
            FlowState::PresentingStage(index) => index,
            FlowState::AwaitingSubmission => return Err(FlowError::NotPresenting.into()),
            FlowState::Closed => return Err(FlowError::Closed.into()),
        };
        let stage = self
            .stages
            .get(index)
            .copied()
            .ok_or(FlowError::NotPresenting)?;

        match stage_action(stage, choice)? {
            StageAction::Next => Ok(self.present(index + 1)),
            StageAction::InsertNotePrompt => {
                self.stages.truncate(index + 1);
                self.stages.push(Stage::NotePrompt);
                Ok(self.present(index + 1))
            }
            StageAction::SaveNote(text) => {
                self.save_note(text.trim()).await?;
                Ok(self.present(index + 1))
            }
            StageAction::Close => Ok(self.close(true)),
        }
    }

    /// The user navigated away. After an accepted check-in the summary is
    /// still refreshed, since the remote data changed.
    pub fn dismiss(&mut self) -> FlowStep {
        match self.state {
            FlowState::AwaitingSubmission => self.close(false),
            FlowState::PresentingStage(_) => self.close(true),
            FlowState::Closed => FlowStep::Closed,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn present(&mut self, index: usize) -> FlowStep {
        let Some(stage) = self.stages.get(index).copied() else {
            return self.close(true);
        };
        self.state = FlowState::PresentingStage(index);

        if let (Stage::Milestone { day }, Some(challenge)) = (stage, self.challenge.as_ref()) {
            let challenge_id = challenge.id.clone();
            if self.registry.mark_seen(&challenge_id, day) {
                self.events.push(Event::MilestoneCelebrated {
                    challenge_id,
                    day,
                    at: Utc::now(),
                });
            }
        }

        debug!(flow_id = %self.flow_id, index, stage = stage.name(), "presenting stage");
        self.events.push(Event::StagePresented {
            flow_id: self.flow_id,
            index,
            stage,
            at: Utc::now(),
        });
        FlowStep::Presenting(stage)
    }

    fn close(&mut self, refresh: bool) -> FlowStep {
        self.state = FlowState::Closed;
        if refresh {
            self.refresher.reload();
        }
        let challenge_id = self.challenge.as_ref().map(|c| c.id.clone());
        info!(flow_id = %self.flow_id, ?challenge_id, refresh, "check-in flow closed");
        self.events.push(Event::FlowClosed {
            flow_id: self.flow_id,
            challenge_id,
            refreshed: refresh,
            at: Utc::now(),
        });
        FlowStep::Closed
    }

    async fn save_note(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Err(ValidationError::Empty("note".into()).into());
        }
        let (challenge_id, day) = match self.challenge.as_ref() {
            Some(challenge) => (challenge.id.clone(), challenge.day),
            None => return Err(FlowError::NotPresenting.into()),
        };
        if let Err(err) = self.backend.save_note(&challenge_id, day, text).await {
            warn!(flow_id = %self.flow_id, challenge_id = %challenge_id, day, error = %err, "note not saved");
            return Err(err.into());
        }
        self.events.push(Event::NoteSaved {
            flow_id: self.flow_id,
            challenge_id,
            day,
            at: Utc::now(),
        });
        Ok(())
    }

    fn reject(&mut self, challenge: &Challenge, reason: String) {
        warn!(
            flow_id = %self.flow_id,
            challenge_id = %challenge.id,
            day = challenge.day,
            reason = %reason,
            "check-in rejected"
        );
        self.events.push(Event::CheckInRejected {
            flow_id: self.flow_id,
            challenge_id: challenge.id.clone(),
            reason,
            at: Utc::now(),
        });
    }

    fn record_sync(&mut self, challenge_id: &str, outcome: SyncOutcome) {
        let (remote_days, degraded): (Vec<u32>, bool) = match outcome {
            SyncOutcome::Merged { remote_days } => (remote_days.into_iter().collect(), false),
            SyncOutcome::Degraded => (Vec::new(), true),
        };
        self.events.push(Event::MilestonesSynced {
            challenge_id: challenge_id.to_string(),
            remote_days,
            degraded,
            at: Utc::now(),
        });
    }
}
