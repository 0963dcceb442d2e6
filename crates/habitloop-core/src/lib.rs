//! # habitloop Core Library
//!
//! Business logic for the habitloop check-in completion pipeline: what
//! happens after a user logs a daily check-in for a challenge. The CLI binary
//! and any app shell are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Timer Session**: A wall-clock-based countdown that requires the caller
//!   to periodically invoke `tick(now)` and forward background/foreground
//!   transitions
//! - **Milestone Registry**: Per-challenge cache of celebrated milestone days,
//!   merged with a remote store and written back best-effort
//! - **Check-in Flow**: The state machine that submits a check-in and walks
//!   the milestone → success → note prompt stages
//! - **Storage**: TOML configuration and a SQLite store implementing the
//!   collaborator traits locally
//!
//! ## Key Components
//!
//! - [`TimerSession`]: Pausable countdown with background compensation
//! - [`MilestoneRegistry`]: Seen-milestone bookkeeping
//! - [`CheckInFlowController`]: Post-check-in stage sequencing
//! - [`CheckInSubmitter`] / [`MilestoneStore`]: Collaborator traits

pub mod error;
pub mod events;
pub mod flow;
pub mod milestone;
pub mod remote;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, FlowError, RemoteError, ValidationError};
pub use events::Event;
pub use flow::{CheckInFlowController, Challenge, FlowState, FlowStep, Stage, StageChoice, TimedGate};
pub use milestone::{FlushReport, MilestoneDays, MilestoneRegistry, SyncOutcome};
pub use remote::{CheckInRecord, CheckInSubmitter, MilestoneStore, NoteRecord, SummaryRefresher};
#[cfg(any(test, feature = "test-util"))]
pub use remote::InMemoryBackend;
pub use storage::{Config, Database};
pub use timer::{TimerSession, TimerState};
