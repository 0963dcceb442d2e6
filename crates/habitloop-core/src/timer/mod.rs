mod session;

pub use session::{TimerSession, TimerState, DEFAULT_TICK_INTERVAL_MS};
