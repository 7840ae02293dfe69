//! Timer engine for Tempo.
//!
//! Every user's session is owned by a [`SessionActor`](actor) task that
//! serializes commands for that user and is the only writer of its record.
//! Writes follow the cache-aside protocol (invalidate → store write → put)
//! against a [`SessionCache`](tempo_session::SessionCache).
//!
//! - [`SessionEngine`]: actor registry, command dispatch, background tasks
//! - [`TickRegistry`] / [`TickScheduler`]: once-per-interval tick delivery
//! - [`SessionApi`]: request-shaped façade for transport layers
//! - [`machine`]: pure state transitions, independent of I/O

mod actor;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod machine;
pub mod scheduler;

pub use api::{
    AutoTransitionRequest, PhaseRequest, SessionApi, SettingsView, StatusView, TimerView,
    UpdateSettingsRequest,
};
pub use config::EngineConfig;
pub use engine::SessionEngine;
pub use error::{EngineError, Result};
pub use machine::TickOutcome;
pub use scheduler::{TickRegistry, TickScheduler};
