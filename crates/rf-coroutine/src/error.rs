//! Scheduler errors

use thiserror::Error;

use crate::task::TaskId;

/// Errors raised by task handles and hosts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Task {0} stepped from inside its own step")]
    Reentrant(TaskId),
}

/// Result type alias
pub type SchedulerResult<T> = Result<T, SchedulerError>;
