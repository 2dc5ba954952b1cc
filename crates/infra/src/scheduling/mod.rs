//! Interval scheduling for background sync cycles.

mod cycle_scheduler;
pub mod error;

pub use cycle_scheduler::{CycleScheduler, CycleSchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
