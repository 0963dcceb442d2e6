mod controller;
mod gate;
mod stage;

pub use controller::{CheckInFlowController, FlowState, FlowStep};
pub use gate::{Challenge, TimedGate};
pub use stage::{build_stages, stage_action, Stage, StageAction, StageChoice};
