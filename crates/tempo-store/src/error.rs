use tempo_types::UserKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session not found for user {0}")]
    NotFound(UserKey),

    #[error("Session already exists for user {0}")]
    AlreadyExists(UserKey),

    #[error("Corrupt session row for user {user}: {reason}")]
    Corrupt { user: i64, reason: String },

    #[error("User key {0} does not fit in a SQLite INTEGER")]
    KeyOutOfRange(UserKey),

    #[error("Storage task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for tempo_session::Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(user) => tempo_session::Error::NotFound(user),
            StoreError::AlreadyExists(user) => tempo_session::Error::AlreadyExists(user),
            other => tempo_session::Error::Storage(other.to_string()),
        }
    }
}
