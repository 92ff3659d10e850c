//! chipload.toml
//!
//! ```toml
//! units = "imperial"
//! machine = "Haas ST-20Y"
//! max_load_pct = 60
//! auto_limit = false
//! presets = "shop_presets.json"
//!
//! [server]
//! addr = "127.0.0.1:3030"
//! ```
//!
//! Every key is optional. Command-line flags override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::power::DEFAULT_MAX_LOAD_PCT;
use crate::presets::{PresetError, PresetLibrary};
use crate::units::UnitSystem;

pub const CONFIG_ENV: &str = "CHIPLOAD_CONFIG";
pub const CONFIG_FILE: &str = "chipload.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("max_load_pct must be between 1 and 100, got {0}")]
    LoadPct(u8),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3030".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub units: UnitSystem,
    pub machine: Option<String>,
    pub max_load_pct: u8,
    pub auto_limit: bool,
    /// JSON preset library replacing the built-in tables
    pub presets: Option<PathBuf>,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            units: UnitSystem::Imperial,
            machine: None,
            max_load_pct: DEFAULT_MAX_LOAD_PCT,
            auto_limit: false,
            presets: None,
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration using the standard search order:
    /// 1. `$CHIPLOAD_CONFIG`
    /// 2. `./chipload.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{} points to a missing file, falling back", CONFIG_ENV);
            }
        }

        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file. Relative preset paths resolve
    /// against the file's directory.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        if let (Some(presets), Some(dir)) = (config.presets.as_ref(), path.parent()) {
            if presets.is_relative() {
                config.presets = Some(dir.join(presets));
            }
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.max_load_pct) {
            return Err(ConfigError::LoadPct(self.max_load_pct));
        }
        Ok(())
    }

    /// The configured preset library, or the built-in one
    pub fn preset_library(&self) -> Result<PresetLibrary, PresetError> {
        match &self.presets {
            Some(path) => {
                info!(path = %path.display(), "Loading preset library");
                PresetLibrary::from_file(path)
            }
            None => PresetLibrary::builtin(),
        }
    }
}
