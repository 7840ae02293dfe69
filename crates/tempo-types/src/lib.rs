//! Shared types for the Tempo timer engine.
//!
//! These types are used by the cache, the storage adapter, and the engine:
//! - [`Phase`] and the auto-transition policy
//! - [`SessionConfig`] / [`SessionState`] / [`Session`]
//! - [`UserKey`], the identity every session is keyed by

mod error;
mod phase;
mod session;

pub use error::{Result, ValidationError};
pub use phase::{DEFAULT_LONG_BREAK_EVERY, Phase, next_phase};
pub use session::{
    DEFAULT_LONG_BREAK_MINUTES, DEFAULT_POMODORO_MINUTES, DEFAULT_SHORT_BREAK_MINUTES,
    MAX_DURATION_MINUTES, MIN_DURATION_MINUTES, Session, SessionConfig, SessionState, UserKey,
};
