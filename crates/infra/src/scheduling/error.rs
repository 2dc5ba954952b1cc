//! Scheduler error types.

use punchbridge_domain::BridgeError;
use thiserror::Error;

use crate::errors::InfraError;

/// Scheduler-specific errors.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running.
    #[error("Scheduler already running")]
    AlreadyRunning,

    /// Scheduler is not running.
    #[error("Scheduler not running")]
    NotRunning,

    /// Background task did not stop in time.
    #[error("Scheduler stop timed out after {seconds}s")]
    StopTimeout { seconds: u64 },

    /// Task join failed.
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let bridge_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                BridgeError::InvalidInput(err.to_string())
            }
            SchedulerError::StopTimeout { .. } | SchedulerError::TaskJoinFailed(_) => {
                BridgeError::Internal(err.to_string())
            }
        };
        InfraError(bridge_err)
    }
}

impl From<SchedulerError> for BridgeError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Result type for scheduler operations.
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
