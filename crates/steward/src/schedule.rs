//! Timer-driven dispatch of configured commands.

pub mod scheduler;

pub use scheduler::{ScheduleEntry, Scheduler};
