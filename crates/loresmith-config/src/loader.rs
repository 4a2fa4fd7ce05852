//! Config file discovery and parsing.
//!
//! Resolution order: an explicit path, then `loresmith.json5` in the working
//! directory, then `~/.loresmith/loresmith.json5`. A missing implicit file
//! falls back to defaults; a missing explicit file is an error.

use crate::{ConfigError, LoresmithConfig};
use directories::BaseDirs;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename.
const DEFAULT_CONFIG_FILE: &str = "loresmith.json5";
/// Default config directory under the user home.
const DEFAULT_CONFIG_DIR: &str = ".loresmith";
/// Default preset filename under the config directory.
const DEFAULT_PRESET_FILE: &str = "presets.json";

/// Options controlling config discovery.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config path; discovery is skipped when set.
    pub explicit_path: Option<PathBuf>,
    /// Working directory for the local layer; `std::env::current_dir` otherwise.
    pub cwd: Option<PathBuf>,
}

/// Load the effective config.
pub fn load_config(options: &LoadOptions) -> Result<LoresmithConfig, ConfigError> {
    if let Some(path) = &options.explicit_path {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        return read_config(path);
    }

    let cwd = match &options.cwd {
        Some(cwd) => cwd.clone(),
        None => std::env::current_dir()?,
    };
    let local = cwd.join(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return read_config(&local);
    }
    if let Some(user) = default_user_config_path() {
        if user.is_file() {
            return read_config(&user);
        }
    }
    debug!("no config file found, using defaults");
    Ok(LoresmithConfig::default())
}

/// Default location of the per-user preset file.
pub fn default_preset_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_PRESET_FILE)
    })
}

fn default_user_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}

fn read_config(path: &Path) -> Result<LoresmithConfig, ConfigError> {
    let raw = fs::read_to_string(path)?;
    let config = json5::from_str(&raw)?;
    info!("loaded config from {}", path.display());
    Ok(config)
}
