//! Project Configuration (ptrcall.toml)
//!
//! Handles project-level configuration stored in `ptrcall.toml` at the project root.

use crate::pool::PoolSection;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name searched for when walking up from a start directory
pub const PROJECT_CONFIG_FILE: &str = "ptrcall.toml";

/// Project configuration from ptrcall.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Frame pool settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolSection>,

    /// Engine extension library settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<LibrarySection>,
}

/// `[library]` table: a host library that hands out the engine's interface
/// functions through an exported get-proc-address function
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LibrarySection {
    /// Library name ("godot_host") or path ("bin/libgodot_host.so")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Exported symbol of the get-proc-address function
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proc_address_symbol: Option<String>,

    /// Extra directories searched before the platform defaults.
    /// Relative entries are resolved against the project root.
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.to_path_buf())
            } else {
                ConfigError::Io(e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse project configuration from TOML text; `path` is used in errors
    pub fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(pool) = &self.pool {
            pool.validate()?;
        }

        if let Some(library) = &self.library {
            let keys = [
                ("library.name", &library.name),
                ("library.proc_address_symbol", &library.proc_address_symbol),
            ];
            for (field, value) in keys {
                if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                    return Err(ConfigError::InvalidValue {
                        field: field.to_string(),
                        reason: "must not be empty".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Name of the extension library, if configured
    pub fn library_name(&self) -> Option<&str> {
        self.library.as_ref().and_then(|l| l.name.as_deref())
    }

    /// Get-proc-address export of the host library, if configured
    pub fn proc_address_symbol(&self) -> Option<&str> {
        self.library
            .as_ref()
            .and_then(|l| l.proc_address_symbol.as_deref())
    }
}
