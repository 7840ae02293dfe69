//! Error types for the engine.

use tempo_types::{UserKey, ValidationError};
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error type.
///
/// `InvalidArgument`, `AlreadyRunning` and `NotRunning` are precondition
/// failures and never mutate anything. Nothing is retried internally.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No timer session for user {0}")]
    NotFound(UserKey),

    #[error("Timer is already running for user {0}")]
    AlreadyRunning(UserKey),

    #[error("Timer is not running for user {0}")]
    NotRunning(UserKey),

    /// The store rejected a read or write. The cache was left invalidated.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The actor went away before answering (panicked or skipped an expired tick).
    #[error("Session actor for user {0} did not reply")]
    ActorUnavailable(UserKey),

    #[error("Engine is shutting down")]
    ShuttingDown,
}

impl EngineError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::StorageUnavailable(_) | EngineError::ActorUnavailable(_)
        )
    }
}

impl From<ValidationError> for EngineError {
    fn from(e: ValidationError) -> Self {
        EngineError::InvalidArgument(e.to_string())
    }
}

impl From<tempo_session::Error> for EngineError {
    fn from(e: tempo_session::Error) -> Self {
        match e {
            tempo_session::Error::NotFound(user) => EngineError::NotFound(user),
            tempo_session::Error::AlreadyExists(user) => {
                EngineError::StorageUnavailable(format!("record for user {user} already exists"))
            }
            tempo_session::Error::Storage(msg) => EngineError::StorageUnavailable(msg),
        }
    }
}
