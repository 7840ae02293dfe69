//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/tempo/config.toml` (XDG user config, or `TEMPO_CONFIG_DIR`)
//! 2. `./tempo.toml` (project-local)
//! 3. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, TempoConfig};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "tempo.toml";

/// Default config filename within XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "tempo";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "TEMPO_CONFIG_DIR";

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: TempoConfig,
    /// Files that were found and merged, lowest precedence first.
    pub loaded_from: Vec<PathBuf>,
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `TEMPO_CONFIG_DIR` and the platform default.
/// Unlike discovery of missing files, a file that exists but fails to parse
/// is an error.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = TempoConfig::new();
    let mut loaded_from = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));

    for path in user_config_path.into_iter().chain(std::iter::once(project_path)) {
        if !path.is_file() {
            continue;
        }
        config.merge(load_config_file(&path)?);
        loaded_from.push(path);
    }

    config.validate()?;
    Ok(LoadedConfig {
        config,
        loaded_from,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<TempoConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    TempoConfig::from_toml(&contents)
}

/// Path of the user config file.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Config directory for tempo: `TEMPO_CONFIG_DIR`, then the platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
