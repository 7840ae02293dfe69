//! Common test utilities for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tempo_engine::{EngineConfig, SessionEngine};
use tempo_session::{CacheConfig, MemoryStore};
use tempo_types::{Session, SessionConfig, UserKey};

pub const USER: UserKey = UserKey(42);

/// Engine over an in-memory store, with no background tasks running.
pub fn engine() -> SessionEngine<MemoryStore> {
    engine_with(EngineConfig::new())
}

pub fn engine_with(config: EngineConfig) -> SessionEngine<MemoryStore> {
    SessionEngine::new(Arc::new(MemoryStore::new()), CacheConfig::new(), config)
}

/// Engine whose user already has a session with the given settings.
pub async fn engine_with_session(
    config: EngineConfig,
    settings: SessionConfig,
) -> SessionEngine<MemoryStore> {
    let engine = engine_with(config);
    engine
        .update_config(USER, settings)
        .await
        .expect("seed session");
    engine
}

pub fn settings(pomodoro: i64, short_break: i64, long_break: i64, auto: bool) -> SessionConfig {
    SessionConfig::try_new(pomodoro, short_break, long_break, auto).expect("valid settings")
}

/// Apply `n` ticks through the engine, returning the last state.
pub async fn tick_n(engine: &SessionEngine<MemoryStore>, user: UserKey, n: u32) -> Session {
    let mut last = None;
    for _ in 0..n {
        last = Some(engine.tick(user).await.expect("tick"));
    }
    last.expect("at least one tick")
}

/// The cached entry, when present, must equal the stored record, and a
/// read-through must return the stored record.
pub async fn assert_cache_matches_store(engine: &SessionEngine<MemoryStore>, user: UserKey) {
    let stored = engine.store().peek(user);
    if let Some(cached) = engine.cache().peek(user).await {
        assert_eq!(Some(cached), stored, "cached entry diverged from store");
    }
    match stored {
        Some(stored) => assert_eq!(engine.get(user).await.expect("read"), stored),
        None => assert!(engine.get(user).await.is_err()),
    }
}
