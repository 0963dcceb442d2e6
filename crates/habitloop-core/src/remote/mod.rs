//! Narrow interfaces to the outside world.
//!
//! The check-in pipeline never talks to a document store directly. It goes
//! through these traits, implemented by the app's backend client, the local
//! SQLite [`Database`](crate::storage::Database), or `InMemoryBackend` in
//! tests (behind the `test-util` feature).

#[cfg(any(test, feature = "test-util"))]
mod memory;
mod traits;

#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryBackend;
pub use traits::{CheckInSubmitter, MilestoneStore, SummaryRefresher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accepted daily check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub challenge_id: String,
    pub day: u32,
    pub duration_secs: Option<u64>,
    pub checked_in_at: DateTime<Utc>,
}

/// A reflection note attached to a check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub challenge_id: String,
    pub day: u32,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
