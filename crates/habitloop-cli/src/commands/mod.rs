pub mod checkin;
pub mod config;
pub mod history;
pub mod milestones;
pub mod timer;
