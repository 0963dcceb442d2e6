//! In-process test double with switchable failures.
//!
//! Single-threaded like the rest of the pipeline, so plain `Cell`/`RefCell`
//! interior mutability is enough.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};

use chrono::Utc;

use super::{CheckInRecord, CheckInSubmitter, MilestoneStore, NoteRecord};
use crate::error::RemoteError;

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    checkins: RefCell<Vec<CheckInRecord>>,
    notes: RefCell<Vec<NoteRecord>>,
    seen: RefCell<HashMap<String, BTreeSet<u32>>>,
    fail_submissions: Cell<bool>,
    fail_notes: Cell<bool>,
    fail_milestone_fetch: Cell<bool>,
    fail_milestone_writes: Cell<bool>,
    milestone_write_attempts: Cell<usize>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend another device already celebrated these days.
    pub fn seed_seen(&self, challenge_id: &str, days: impl IntoIterator<Item = u32>) {
        self.seen
            .borrow_mut()
            .entry(challenge_id.to_string())
            .or_default()
            .extend(days);
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.set(fail);
    }

    pub fn fail_notes(&self, fail: bool) {
        self.fail_notes.set(fail);
    }

    pub fn fail_milestone_fetch(&self, fail: bool) {
        self.fail_milestone_fetch.set(fail);
    }

    pub fn fail_milestone_writes(&self, fail: bool) {
        self.fail_milestone_writes.set(fail);
    }

    pub fn checkins(&self) -> Vec<CheckInRecord> {
        self.checkins.borrow().clone()
    }

    pub fn notes(&self) -> Vec<NoteRecord> {
        self.notes.borrow().clone()
    }

    pub fn remote_seen(&self, challenge_id: &str) -> BTreeSet<u32> {
        self.seen.borrow().get(challenge_id).cloned().unwrap_or_default()
    }

    /// Number of `record_milestone_seen` calls, including failed ones.
    pub fn milestone_write_attempts(&self) -> usize {
        self.milestone_write_attempts.get()
    }
}

impl CheckInSubmitter for InMemoryBackend {
    async fn submit_check_in(
        &self,
        challenge_id: &str,
        day: u32,
        duration_secs: Option<u64>,
    ) -> Result<(), RemoteError> {
        if self.fail_submissions.get() {
            return Err(RemoteError::new("submit_check_in", "backend unavailable"));
        }
        let mut checkins = self.checkins.borrow_mut();
        if checkins
            .iter()
            .any(|c| c.challenge_id == challenge_id && c.day == day)
        {
            return Err(RemoteError::new(
                "submit_check_in",
                format!("day {day} already checked in"),
            ));
        }
        checkins.push(CheckInRecord {
            challenge_id: challenge_id.to_string(),
            day,
            duration_secs,
            checked_in_at: Utc::now(),
        });
        Ok(())
    }

    async fn save_note(&self, challenge_id: &str, day: u32, text: &str) -> Result<(), RemoteError> {
        if self.fail_notes.get() {
            return Err(RemoteError::new("save_note", "backend unavailable"));
        }
        self.notes.borrow_mut().push(NoteRecord {
            challenge_id: challenge_id.to_string(),
            day,
            text: text.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

impl MilestoneStore for InMemoryBackend {
    async fn fetch_seen_milestones(&self, challenge_id: &str) -> Result<BTreeSet<u32>, RemoteError> {
        if self.fail_milestone_fetch.get() {
            return Err(RemoteError::new("fetch_seen_milestones", "backend unavailable"));
        }
        Ok(self.remote_seen(challenge_id))
    }

    async fn record_milestone_seen(&self, challenge_id: &str, day: u32) -> Result<(), RemoteError> {
        self.milestone_write_attempts
            .set(self.milestone_write_attempts.get() + 1);
        if self.fail_milestone_writes.get() {
            return Err(RemoteError::new("record_milestone_seen", "backend unavailable"));
        }
        self.seed_seen(challenge_id, [day]);
        Ok(())
    }
}
