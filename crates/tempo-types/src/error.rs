//! Validation errors for session types.

use thiserror::Error;

use crate::Phase;

/// Result type alias for validation.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// A value that cannot be accepted into a [`SessionConfig`](crate::SessionConfig)
/// or parsed as a [`Phase`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A phase duration is outside `[MIN_DURATION_MINUTES, MAX_DURATION_MINUTES]`.
    #[error("{phase} duration must be between {min} and {max} minutes, got {value}")]
    DurationOutOfRange {
        phase: Phase,
        value: i64,
        min: u32,
        max: u32,
    },

    /// Unknown phase name.
    #[error("unknown phase '{0}' (expected pomodoro, shortBreak or longBreak)")]
    UnknownPhase(String),
}
