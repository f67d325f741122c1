//! Global Configuration (~/.ptrcall/config.toml)
//!
//! Handles user-level configuration stored in `~/.ptrcall/config.toml`.

use crate::pool::PoolSection;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.ptrcall/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Frame pool defaults applied to every project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolSection>,

    /// Library directories searched after the project's own
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.to_path_buf())
            } else {
                ConfigError::Io(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(pool) = &self.pool {
            pool.validate()?;
        }

        for path in &self.search_paths {
            if path.is_relative() {
                return Err(ConfigError::InvalidValue {
                    field: "search_paths".to_string(),
                    reason: format!("global search paths must be absolute, got '{}'", path.display()),
                });
            }
        }

        Ok(())
    }

    /// Get the global config file path (~/.ptrcall/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".ptrcall").join("config.toml"))
    }
}
