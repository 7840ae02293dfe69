//! SQLite storage for timer sessions.
//!
//! [`SqliteSessionStore`] keeps one row per user in `timer_sessions` and
//! implements [`tempo_session::SessionStore`], so it can sit behind the
//! session cache and the engine.

mod error;
mod store;

pub use error::{Result, StoreError};
pub use store::SqliteSessionStore;
