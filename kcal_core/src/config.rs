//! Configuration file support.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/kcal/config.toml` and
//! passed explicitly into the code that needs it. There is no ambient
//! global settings state.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub import: ImportConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Progress/balance computation toggles
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Subtract exercise calories burned from net consumed
    #[serde(default = "default_true")]
    pub include_exercise: bool,

    /// Subtract the thermic-effect-of-food bonus from net consumed
    #[serde(default)]
    pub apply_tef: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            include_exercise: default_true(),
            apply_tef: false,
        }
    }
}

/// Import summary presentation limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_error_preview")]
    pub error_preview: usize,

    #[serde(default = "default_warning_preview")]
    pub warning_preview: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            error_preview: default_error_preview(),
            warning_preview: default_warning_preview(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("kcal")
}

fn default_true() -> bool {
    true
}

fn default_error_preview() -> usize {
    5
}

fn default_warning_preview() -> usize {
    3
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("kcal").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
