//! Layered configuration resolution
//!
//! Reads the global and project files, applies `PTRCALL_POOL_*` overrides and
//! resolves the result into a [`Config`].

use crate::global::GlobalConfig;
use crate::pool::{PoolConfig, PoolSection};
use crate::project::{ProjectConfig, PROJECT_CONFIG_FILE};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

pub const ENV_POOL_MAX_IDLE: &str = "PTRCALL_POOL_MAX_IDLE";
pub const ENV_POOL_PREWARM: &str = "PTRCALL_POOL_PREWARM";
pub const ENV_POOL_SCRUB: &str = "PTRCALL_POOL_SCRUB";

/// Resolves configuration for one process.
///
/// Keys from the global file are overridden by ptrcall.toml, which is in turn
/// overridden by the environment.
pub struct ConfigLoader {
    /// Global file override; `None` means ~/.ptrcall/config.toml
    global_config_path: Option<PathBuf>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Resolved frame pool settings
    pub pool: PoolConfig,

    /// Host library name or path, if configured
    pub library: Option<String>,

    /// Get-proc-address export of the host library, if configured
    pub proc_address_symbol: Option<String>,

    /// Library search paths, project entries first
    pub search_paths: Vec<PathBuf>,

    /// Project root directory (where ptrcall.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Create a loader that reads the global config from `path` instead of
    /// the home directory
    pub fn with_global_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Resolve configuration for `start_dir`.
    ///
    /// Walks up the directory tree to find ptrcall.toml, then merges it over the
    /// global config if one exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let global_config = self.load_global_config()?;
        self.merge(global_config, project_config, project_root)
    }

    /// Resolve configuration using `config_path` as the project file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config()?;
        let project_root = config_path.parent().map(|p| p.to_path_buf());
        self.merge(global_config, project_config, project_root)
    }

    fn merge(
        &self,
        global: GlobalConfig,
        project: ProjectConfig,
        project_root: Option<PathBuf>,
    ) -> ConfigResult<Config> {
        let mut section = global.pool.unwrap_or_default();
        if let Some(project_pool) = &project.pool {
            section.merge(project_pool);
        }
        section.merge(&self.env_overrides()?);

        let mut search_paths = Vec::new();
        if let Some(library) = &project.library {
            for path in &library.search_paths {
                match (&project_root, path.is_relative()) {
                    (Some(root), true) => search_paths.push(root.join(path)),
                    _ => search_paths.push(path.clone()),
                }
            }
        }
        search_paths.extend(global.search_paths.iter().cloned());

        Ok(Config {
            pool: section.resolve()?,
            library: project.library_name().map(str::to_string),
            proc_address_symbol: project.proc_address_symbol().map(str::to_string),
            search_paths,
            project_root,
        })
    }

    /// Nearest ptrcall.toml at or above `start_dir`
    ///
    /// Returns (project_root, project_config); a missing file yields defaults
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.ptrcall/config.toml
    ///
    /// A missing file, or a missing home directory, yields defaults. A file
    /// that exists but does not parse is an error.
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        if self.global_config_path.is_none() {
            match GlobalConfig::global_config_path() {
                Ok(path) => self.global_config_path = Some(path),
                Err(ConfigError::NoHomeDir) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            }
        }

        match self.global_config_path.as_deref() {
            Some(path) if path.exists() => GlobalConfig::load_from_file(path),
            _ => Ok(GlobalConfig::default()),
        }
    }

    /// Collect PTRCALL_POOL_* overrides as a pool section
    fn env_overrides(&self) -> ConfigResult<PoolSection> {
        let mut section = PoolSection::default();

        if let Ok(value) = env::var(ENV_POOL_MAX_IDLE) {
            section.max_idle = Some(parse_count(ENV_POOL_MAX_IDLE, &value)?);
        }

        if let Ok(value) = env::var(ENV_POOL_PREWARM) {
            section.prewarm = Some(parse_count(ENV_POOL_PREWARM, &value)?);
        }

        if let Ok(value) = env::var(ENV_POOL_SCRUB) {
            section.scrub_on_release = Some(parse_flag(ENV_POOL_SCRUB, &value)?);
        }

        Ok(section)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Directory that holds the ptrcall.toml in use
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a ptrcall.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            library: None,
            proc_address_symbol: None,
            search_paths: Vec::new(),
            project_root: None,
        }
    }
}

fn parse_count(field: &str, value: &str) -> ConfigResult<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a non-negative integer, got '{}'", value),
        })
}

fn parse_flag(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{}'", value),
        }),
    }
}
