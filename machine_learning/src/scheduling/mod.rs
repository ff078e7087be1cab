//! Learning rate schedules, advanced once per training epoch.

mod lr_scheduler;

pub use lr_scheduler::{LrPolicy, LrScheduler, LrSchedulerState};
