//! Timed check-in session.
//!
//! The session is a wall-clock-based state machine. It does not use
//! internal threads - the caller drives it with `tick(now)` from a periodic
//! callback and forwards app lifecycle changes.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |
//!           v
//!       Completed
//! ```
//!
//! Elapsed time is always recomputed from the start anchor
//! (`now - run_started_at`), never accumulated from tick deltas, so missed
//! ticks and time spent in the background cannot drift the count.
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = TimerSession::new(600);
//! session.start(Utc::now());
//! // Every <=100ms:
//! if let Some(Event::TimerCompleted { .. }) = session.tick(Utc::now()) {
//!     // play the completion cue
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::Event;

/// Recommended granularity for the periodic `tick` callback.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Countdown for a timed challenge check-in.
///
/// Every command takes the current wall-clock time so callers (and tests)
/// control the clock. Commands issued in a state that does not accept them
/// return `None` and change nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSession {
    state: TimerState,
    target_ms: u64,
    elapsed_ms: u64,
    /// Start of the current Running interval, shifted back by any elapsed
    /// time carried over from a pause.
    #[serde(default)]
    run_started_at: Option<DateTime<Utc>>,
    /// Set while the host app is suspended during a Running session.
    #[serde(default)]
    backgrounded_at: Option<DateTime<Utc>>,
}

impl TimerSession {
    /// Create an idle session with the given target in seconds.
    pub fn new(target_secs: u64) -> Self {
        Self {
            state: TimerState::Idle,
            target_ms: target_secs.saturating_mul(1000),
            elapsed_ms: 0,
            run_started_at: None,
            backgrounded_at: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn target_ms(&self) -> u64 {
        self.target_ms
    }

    pub fn target_secs(&self) -> u64 {
        self.target_ms / 1000
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Whole seconds of active time.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_ms / 1000
    }

    pub fn remaining_ms(&self) -> u64 {
        self.target_ms.saturating_sub(self.elapsed_ms)
    }

    /// 0.0 .. 1.0 progress toward the target.
    pub fn progress(&self) -> f64 {
        if self.target_ms == 0 {
            return if self.state == TimerState::Completed { 1.0 } else { 0.0 };
        }
        (self.elapsed_ms as f64 / self.target_ms as f64).min(1.0)
    }

    pub fn is_completed(&self) -> bool {
        self.state == TimerState::Completed
    }

    /// True once any active time has been recorded.
    pub fn has_progress(&self) -> bool {
        self.elapsed_ms > 0
    }

    pub fn is_backgrounded(&self) -> bool {
        self.backgrounded_at.is_some()
    }

    pub fn run_started_at(&self) -> Option<DateTime<Utc>> {
        self.run_started_at
    }

    /// Build a full state snapshot event for the countdown display.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        Event::TimerSnapshot {
            state: self.state,
            target_ms: self.target_ms,
            elapsed_ms: self.elapsed_ms,
            remaining_ms: self.remaining_ms(),
            progress: self.progress(),
            backgrounded: self.is_backgrounded(),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Change the target. Only honored while Idle and for a non-zero value.
    pub fn set_target_secs(&mut self, target_secs: u64) -> bool {
        if self.state != TimerState::Idle || target_secs == 0 {
            debug!(state = ?self.state, target_secs, "ignoring target change");
            return false;
        }
        self.target_ms = target_secs.saturating_mul(1000);
        true
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let resumed = match self.state {
            TimerState::Idle => {
                self.elapsed_ms = 0;
                false
            }
            TimerState::Paused => true,
            TimerState::Running | TimerState::Completed => return None,
        };
        self.run_started_at = Some(now - millis(self.elapsed_ms));
        self.backgrounded_at = None;
        self.state = TimerState::Running;
        debug!(elapsed_ms = self.elapsed_ms, resumed, "timer running");
        Some(Event::TimerStarted {
            target_ms: self.target_ms,
            elapsed_ms: self.elapsed_ms,
            resumed,
            at: now,
        })
    }

    /// Call periodically. Returns `Some(Event::TimerCompleted)` when the
    /// target is reached. Ignored while backgrounded.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TimerState::Running || self.backgrounded_at.is_some() {
            return None;
        }
        self.recompute(now);
        if self.elapsed_ms >= self.target_ms {
            return self.complete(now);
        }
        None
    }

    /// Freeze elapsed time. If the target was already reached by `now`, the
    /// session completes instead.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.recompute(now);
        if self.elapsed_ms >= self.target_ms {
            return self.complete(now);
        }
        self.run_started_at = None;
        self.backgrounded_at = None;
        self.state = TimerState::Paused;
        debug!(elapsed_ms = self.elapsed_ms, "timer paused");
        Some(Event::TimerPaused {
            elapsed_ms: self.elapsed_ms,
            at: now,
        })
    }

    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state == TimerState::Completed {
            return None;
        }
        self.state = TimerState::Idle;
        self.elapsed_ms = 0;
        self.run_started_at = None;
        self.backgrounded_at = None;
        debug!("timer reset");
        Some(Event::TimerReset { at: now })
    }

    /// Idempotent. Only the first call returns the completion event.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state == TimerState::Completed {
            return None;
        }
        self.state = TimerState::Completed;
        self.elapsed_ms = self.target_ms;
        self.run_started_at = None;
        self.backgrounded_at = None;
        debug!(target_ms = self.target_ms, "timer completed");
        Some(Event::TimerCompleted {
            target_ms: self.target_ms,
            at: now,
        })
    }

    /// Host app suspended. Stops periodic recomputation; the session stays
    /// Running from the user's point of view.
    pub fn on_backgrounded(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TimerState::Running || self.backgrounded_at.is_some() {
            return None;
        }
        self.recompute(now);
        if self.elapsed_ms >= self.target_ms {
            return self.complete(now);
        }
        self.backgrounded_at = Some(now);
        debug!(elapsed_ms = self.elapsed_ms, "timer backgrounded");
        Some(Event::TimerBackgrounded {
            elapsed_ms: self.elapsed_ms,
            at: now,
        })
    }

    /// Host app resumed. Time spent away counts as active time, so the
    /// session may complete here.
    pub fn on_foregrounded(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let since = self.backgrounded_at.take()?;
        let away_ms = non_negative_ms(now - since);
        self.recompute(now);
        debug!(away_ms, elapsed_ms = self.elapsed_ms, "timer foregrounded");
        if self.elapsed_ms >= self.target_ms {
            return self.complete(now);
        }
        Some(Event::TimerForegrounded {
            away_ms,
            elapsed_ms: self.elapsed_ms,
            at: now,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Recompute elapsed from the anchor. Never moves backwards, even if
    /// the wall clock does, and never exceeds the target.
    fn recompute(&mut self, now: DateTime<Utc>) {
        if let Some(anchor) = self.run_started_at {
            let computed = non_negative_ms(now - anchor).min(self.target_ms);
            self.elapsed_ms = self.elapsed_ms.max(computed);
        }
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

fn non_negative_ms(delta: Duration) -> u64 {
    u64::try_from(delta.num_milliseconds()).unwrap_or(0)
}
