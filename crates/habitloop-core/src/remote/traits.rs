use std::collections::BTreeSet;

use crate::error::RemoteError;

/// Persists check-ins and their notes.
///
/// Calls are suspend points for the flow controller; dropping the returned
/// future only stops listening for the result.
#[allow(async_fn_in_trait)]
pub trait CheckInSubmitter {
    /// Record the check-in for `day`. `duration_secs` is present for timed
    /// challenges.
    async fn submit_check_in(
        &self,
        challenge_id: &str,
        day: u32,
        duration_secs: Option<u64>,
    ) -> Result<(), RemoteError>;

    /// Attach a reflection note to an existing check-in.
    async fn save_note(&self, _challenge_id: &str, _day: u32, _text: &str) -> Result<(), RemoteError> {
        Ok(()) // default no-op
    }
}

/// Remote record of which milestones were already celebrated, shared
/// between devices.
#[allow(async_fn_in_trait)]
pub trait MilestoneStore {
    async fn fetch_seen_milestones(&self, challenge_id: &str) -> Result<BTreeSet<u32>, RemoteError>;

    /// Best-effort. Callers never roll back local state on failure.
    async fn record_milestone_seen(&self, challenge_id: &str, day: u32) -> Result<(), RemoteError>;
}

/// Reloads the challenge summary (streak, days completed) once the flow
/// closes.
pub trait SummaryRefresher {
    fn reload(&mut self);
}

impl<F: FnMut()> SummaryRefresher for F {
    fn reload(&mut self) {
        self()
    }
}

impl<T: CheckInSubmitter> CheckInSubmitter for &T {
    async fn submit_check_in(
        &self,
        challenge_id: &str,
        day: u32,
        duration_secs: Option<u64>,
    ) -> Result<(), RemoteError> {
        (**self).submit_check_in(challenge_id, day, duration_secs).await
    }

    async fn save_note(&self, challenge_id: &str, day: u32, text: &str) -> Result<(), RemoteError> {
        (**self).save_note(challenge_id, day, text).await
    }
}

impl<T: MilestoneStore> MilestoneStore for &T {
    async fn fetch_seen_milestones(&self, challenge_id: &str) -> Result<BTreeSet<u32>, RemoteError> {
        (**self).fetch_seen_milestones(challenge_id).await
    }

    async fn record_milestone_seen(&self, challenge_id: &str, day: u32) -> Result<(), RemoteError> {
        (**self).record_milestone_seen(challenge_id, day).await
    }
}
