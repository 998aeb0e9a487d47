//! Bus errors

use thiserror::Error;

/// Errors raised by the channel pair lifecycle
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    #[error("Channel pair is not initialized")]
    NotInitialized,

    #[error("Channel pair is already initialized")]
    AlreadyInitialized,
}

/// Result type alias
pub type BusResult<T> = Result<T, BusError>;
