//! Error types for session cache and store operations.

use tempo_types::UserKey;

/// Error type for session cache and store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No session record exists for the user.
    #[error("Session not found for user {0}")]
    NotFound(UserKey),

    /// A record already exists where a new one was to be created.
    #[error("Session already exists for user {0}")]
    AlreadyExists(UserKey),

    /// The backing store could not serve the request.
    #[error("Storage unavailable: {0}")]
    Storage(String),
}

/// Result type for session cache operations.
pub type Result<T> = std::result::Result<T, Error>;
