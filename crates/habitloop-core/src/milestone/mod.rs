mod days;
mod registry;

pub use days::{MilestoneDays, DEFAULT_MILESTONE_DAYS};
pub use registry::{FlushReport, MilestoneRegistry, SyncOutcome};
