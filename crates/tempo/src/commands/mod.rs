//! CLI command handlers.

pub mod reset;
pub mod run;
pub mod settings;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use console::Style;
use serde::Serialize;
use tempo_config::TempoConfig;
use tempo_engine::{EngineConfig, SessionApi, SessionEngine, StatusView};
use tempo_session::CacheConfig;
use tempo_store::SqliteSessionStore;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration.
    pub config: TempoConfig,
    /// Resolved database path.
    pub database: PathBuf,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    pub fn engine_config(&self) -> EngineConfig {
        let config = &self.config;
        EngineConfig::new()
            .with_tick_interval(config.tick_interval())
            .with_seconds_per_tick(config.seconds_per_tick())
            .with_flush_every_ticks(config.flush_every_ticks())
            .with_tick_timeout(config.tick_timeout())
            .with_actor_idle_timeout(config.actor_idle_timeout())
            .with_long_break_every(config.long_break_every())
    }

    pub fn cache_config(&self) -> CacheConfig {
        let config = &self.config;
        let cache = CacheConfig::new()
            .with_max_sessions(config.max_sessions())
            .with_sweep_interval(config.cleanup_interval());
        match config.cache_ttl() {
            Some(ttl) => cache.with_ttl(ttl),
            None => cache.without_ttl(),
        }
    }

    /// Open the database and build a session API over it.
    pub fn open_api(&self) -> Result<SessionApi<SqliteSessionStore>> {
        let store = SqliteSessionStore::open(&self.database)
            .with_context(|| format!("failed to open database {}", self.database.display()))?;
        let engine = SessionEngine::new(Arc::new(store), self.cache_config(), self.engine_config());
        Ok(SessionApi::new(engine))
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `mm:ss` for a remaining-seconds value.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub fn print_status(user: u64, status: &StatusView) {
    let dim = Style::new().dim();
    let state = if status.is_running {
        Style::new().green().apply_to("● running")
    } else {
        Style::new().yellow().apply_to("○ stopped")
    };

    println!();
    println!("{}", console::style(format!("Timer for user {user}")).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("State:    "), state);
    println!("  {} {}", dim.apply_to("Phase:    "), status.current_phase);
    println!(
        "  {} {}",
        dim.apply_to("Remaining:"),
        format_clock(status.remaining_time)
    );
    println!(
        "  {} {} this cycle, {} total",
        dim.apply_to("Completed:"),
        status.completed_pomodoros,
        status.total_completed_pomodoros
    );
    println!(
        "  {} {}",
        dim.apply_to("Auto:     "),
        if status.auto_transition { "on" } else { "off" }
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(299), "04:59");
    }

    #[test]
    fn test_engine_config_from_file_values() {
        let config = TempoConfig::from_toml(
            "[engine]\ntick_interval_ms = 250\nflush_every_ticks = 3\nlong_break_every = 2\n",
        )
        .unwrap();
        let ctx = Context {
            config,
            database: PathBuf::from("tempo.db"),
            json_output: false,
            verbose: false,
        };
        let engine = ctx.engine_config();
        assert_eq!(engine.tick_interval.as_millis(), 250);
        assert_eq!(engine.seconds_per_tick, 1);
        assert_eq!(engine.flush_every_ticks, 3);
        assert_eq!(engine.long_break_every, 2);
        assert!(ctx.cache_config().ttl.is_none());
        assert_eq!(ctx.cache_config().effective_sweep_interval(), None);
    }
}
