//! Configuration system for the Tempo timer engine.
//!
//! Provides TOML-based configuration with:
//! - `[engine]` tick cadence, buffered-write interval and actor lifetimes
//! - `[cache]` session cache capacity and TTL
//! - `[storage]` database location
//! - `[logging]` console level and rolling file output
//! - Config file layering (XDG user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
