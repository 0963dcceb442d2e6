//! Per-challenge record of celebrated milestones.
//!
//! The local cache is authoritative for the session. Remote state is merged
//! in once per challenge by [`MilestoneRegistry::sync`], and local marks are
//! pushed back through a best-effort write queue drained by
//! [`MilestoneRegistry::flush_pending`].
//!
//! A milestone that has been shown is never "unshown": merges are a set
//! union, and failed remote writes leave the local mark in place.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use super::days::MilestoneDays;
use crate::remote::MilestoneStore;

/// Result of merging remote state into the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote days were fetched and merged.
    Merged { remote_days: BTreeSet<u32> },
    /// Fetch failed; the session continues on local knowledge only.
    Degraded,
}

/// Delivery summary for queued remote writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingWrite {
    challenge_id: String,
    day: u32,
}

pub struct MilestoneRegistry<S> {
    store: S,
    days: MilestoneDays,
    /// Lazily created per challenge; only ever appended to.
    seen: HashMap<String, BTreeSet<u32>>,
    synced: HashSet<String>,
    pending: Vec<PendingWrite>,
}

impl<S: MilestoneStore> MilestoneRegistry<S> {
    pub fn new(store: S, days: MilestoneDays) -> Self {
        Self {
            store,
            days,
            seen: HashMap::new(),
            synced: HashSet::new(),
            pending: Vec::new(),
        }
    }

    pub fn days(&self) -> &MilestoneDays {
        &self.days
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch remote seen days and merge them into the cache.
    ///
    /// Never fails: an unreachable store degrades to "nothing seen
    /// remotely" for this session.
    pub async fn sync(&mut self, challenge_id: &str) -> SyncOutcome {
        let fetched = self.store.fetch_seen_milestones(challenge_id).await;
        let entry = self.seen.entry(challenge_id.to_string()).or_default();
        self.synced.insert(challenge_id.to_string());

        match fetched {
            Ok(remote_days) => {
                entry.extend(remote_days.iter().copied());
                info!(
                    challenge_id,
                    remote = remote_days.len(),
                    total = entry.len(),
                    "milestones synced"
                );
                SyncOutcome::Merged { remote_days }
            }
            Err(err) => {
                warn!(challenge_id, error = %err, "milestone sync failed, using local state");
                SyncOutcome::Degraded
            }
        }
    }

    /// Sync once per challenge per session. Returns `None` when already done.
    pub async fn ensure_synced(&mut self, challenge_id: &str) -> Option<SyncOutcome> {
        if self.is_synced(challenge_id) {
            return None;
        }
        Some(self.sync(challenge_id).await)
    }

    pub fn is_synced(&self, challenge_id: &str) -> bool {
        self.synced.contains(challenge_id)
    }

    pub fn is_seen(&self, challenge_id: &str, day: u32) -> bool {
        self.seen
            .get(challenge_id)
            .is_some_and(|days| days.contains(&day))
    }

    /// True iff `day` is a milestone that has not been celebrated yet.
    pub fn should_show(&self, challenge_id: &str, day: u32) -> bool {
        self.days.is_milestone(day) && !self.is_seen(challenge_id, day)
    }

    /// Mark a milestone as celebrated and queue the remote write.
    ///
    /// Returns true only the first time; non-milestone days are ignored.
    pub fn mark_seen(&mut self, challenge_id: &str, day: u32) -> bool {
        if !self.days.is_milestone(day) {
            debug!(challenge_id, day, "not a milestone day");
            return false;
        }
        let inserted = self
            .seen
            .entry(challenge_id.to_string())
            .or_default()
            .insert(day);
        if inserted {
            info!(challenge_id, day, "milestone marked seen");
            self.pending.push(PendingWrite {
                challenge_id: challenge_id.to_string(),
                day,
            });
        }
        inserted
    }

    /// Seen days for a challenge, ascending.
    pub fn seen_days(&self, challenge_id: &str) -> Vec<u32> {
        self.seen
            .get(challenge_id)
            .map(|days| days.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Send queued writes, oldest first. Failures are logged and dropped;
    /// the local mark stays either way.
    ///
    /// A write leaves the queue only once its call resolves, so dropping
    /// this future keeps everything not yet delivered.
    pub async fn flush_pending(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        while let Some(write) = self.pending.first().cloned() {
            let result = self
                .store
                .record_milestone_seen(&write.challenge_id, write.day)
                .await;
            self.pending.remove(0);
            match result {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    warn!(
                        challenge_id = %write.challenge_id,
                        day = write.day,
                        error = %err,
                        "best-effort milestone write failed"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}
