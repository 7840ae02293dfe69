//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_FLUSH_EVERY_TICKS: u32 = 10;
pub const DEFAULT_TICK_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_ACTOR_IDLE_SECS: u64 = 300;
pub const DEFAULT_LONG_BREAK_EVERY: u32 = 4;
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_DATABASE_FILE: &str = "tempo.db";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Root configuration. Every section is optional; accessors fill defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TempoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingSection>,
}

/// `[engine]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Milliseconds between scheduler ticks.
    pub tick_interval_ms: Option<u64>,
    /// Seconds taken off the clock per tick. Defaults to the tick interval,
    /// rounded, and never less than one.
    pub seconds_per_tick: Option<u32>,
    /// Non-boundary ticks buffered in memory before a store write.
    pub flush_every_ticks: Option<u32>,
    /// How long a tick delivery may wait on a busy actor before it is dropped.
    pub tick_timeout_ms: Option<u64>,
    /// Seconds an idle, stopped actor lingers before retiring.
    pub actor_idle_secs: Option<u64>,
    /// Completed work intervals per long break.
    pub long_break_every: Option<u32>,
}

/// `[cache]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    pub max_sessions: Option<usize>,
    /// Absent means cached entries never expire.
    pub ttl_secs: Option<u64>,
    pub cleanup_interval_secs: Option<u64>,
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    /// SQLite database path. Relative paths resolve against the data dir.
    pub database: Option<PathBuf>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Console filter directive, e.g. `info` or `tempo_engine=debug,info`.
    pub level: Option<String>,
    /// Write a daily-rotated JSON log next to the config.
    pub file: Option<bool>,
}

impl TempoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: TempoConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge another config on top of this one (other takes priority, per field).
    pub fn merge(&mut self, other: TempoConfig) {
        if let Some(engine) = other.engine {
            let base = self.engine.get_or_insert_with(Default::default);
            base.tick_interval_ms = engine.tick_interval_ms.or(base.tick_interval_ms);
            base.seconds_per_tick = engine.seconds_per_tick.or(base.seconds_per_tick);
            base.flush_every_ticks = engine.flush_every_ticks.or(base.flush_every_ticks);
            base.tick_timeout_ms = engine.tick_timeout_ms.or(base.tick_timeout_ms);
            base.actor_idle_secs = engine.actor_idle_secs.or(base.actor_idle_secs);
            base.long_break_every = engine.long_break_every.or(base.long_break_every);
        }
        if let Some(cache) = other.cache {
            let base = self.cache.get_or_insert_with(Default::default);
            base.max_sessions = cache.max_sessions.or(base.max_sessions);
            base.ttl_secs = cache.ttl_secs.or(base.ttl_secs);
            base.cleanup_interval_secs = cache.cleanup_interval_secs.or(base.cleanup_interval_secs);
        }
        if let Some(storage) = other.storage {
            let base = self.storage.get_or_insert_with(Default::default);
            base.database = storage.database.or(base.database.take());
        }
        if let Some(logging) = other.logging {
            let base = self.logging.get_or_insert_with(Default::default);
            base.level = logging.level.or(base.level.take());
            base.file = logging.file.or(base.file);
        }
    }

    /// Reject values that parse but cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval() < Duration::from_millis(10) {
            return Err(invalid("engine.tick_interval_ms", "must be at least 10"));
        }
        if self.seconds_per_tick() == 0 {
            return Err(invalid("engine.seconds_per_tick", "must be at least 1"));
        }
        if self.flush_every_ticks() == 0 {
            return Err(invalid("engine.flush_every_ticks", "must be at least 1"));
        }
        if self.tick_timeout().is_zero() {
            return Err(invalid("engine.tick_timeout_ms", "must be greater than 0"));
        }
        if self.long_break_every() == 0 {
            return Err(invalid("engine.long_break_every", "must be at least 1"));
        }
        if self.max_sessions() == 0 {
            return Err(invalid("cache.max_sessions", "must be at least 1"));
        }
        if self.cache_ttl().is_some_and(|ttl| ttl.is_zero()) {
            return Err(invalid("cache.ttl_secs", "must be greater than 0 when set"));
        }
        Ok(())
    }

    // ── Engine ──────────────────────────────────────────────────────

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(
            self.engine
                .as_ref()
                .and_then(|e| e.tick_interval_ms)
                .unwrap_or(DEFAULT_TICK_INTERVAL_MS),
        )
    }

    pub fn seconds_per_tick(&self) -> u32 {
        self.engine
            .as_ref()
            .and_then(|e| e.seconds_per_tick)
            .unwrap_or_else(|| {
                let millis = self.tick_interval().as_millis();
                ((millis + 500) / 1000).max(1) as u32
            })
    }

    pub fn flush_every_ticks(&self) -> u32 {
        self.engine
            .as_ref()
            .and_then(|e| e.flush_every_ticks)
            .unwrap_or(DEFAULT_FLUSH_EVERY_TICKS)
    }

    pub fn tick_timeout(&self) -> Duration {
        Duration::from_millis(
            self.engine
                .as_ref()
                .and_then(|e| e.tick_timeout_ms)
                .unwrap_or(DEFAULT_TICK_TIMEOUT_MS),
        )
    }

    pub fn actor_idle_timeout(&self) -> Duration {
        Duration::from_secs(
            self.engine
                .as_ref()
                .and_then(|e| e.actor_idle_secs)
                .unwrap_or(DEFAULT_ACTOR_IDLE_SECS),
        )
    }

    pub fn long_break_every(&self) -> u32 {
        self.engine
            .as_ref()
            .and_then(|e| e.long_break_every)
            .unwrap_or(DEFAULT_LONG_BREAK_EVERY)
    }

    // ── Cache ───────────────────────────────────────────────────────

    pub fn max_sessions(&self) -> usize {
        self.cache
            .as_ref()
            .and_then(|c| c.max_sessions)
            .unwrap_or(DEFAULT_MAX_SESSIONS)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache
            .as_ref()
            .and_then(|c| c.ttl_secs)
            .map(Duration::from_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(
            self.cache
                .as_ref()
                .and_then(|c| c.cleanup_interval_secs)
                .unwrap_or(DEFAULT_CLEANUP_INTERVAL_SECS),
        )
    }

    // ── Storage / logging ───────────────────────────────────────────

    /// Database path, resolving relative paths against `data_dir`.
    pub fn database_path(&self, data_dir: &std::path::Path) -> PathBuf {
        let configured = self
            .storage
            .as_ref()
            .and_then(|s| s.database.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE));
        if configured.is_absolute() {
            configured
        } else {
            data_dir.join(configured)
        }
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_to_file(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.file).unwrap_or(true)
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
