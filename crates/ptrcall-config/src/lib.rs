//! ptrcall configuration
//!
//! Settings for the call-frame pool and for locating the engine's extension
//! library:
//! - Project configuration (ptrcall.toml)
//! - Global user configuration (~/.ptrcall/config.toml)
//! - Environment overrides (PTRCALL_*)
//!
//! Sources, each overriding the ones before it:
//! 1. Built-in defaults
//! 2. Global config (~/.ptrcall/config.toml)
//! 3. Project config (./ptrcall.toml, searched upwards)
//! 4. Environment variables (PTRCALL_*)
//!
//! ```no_run
//! use ptrcall_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("keeping up to {} idle frames", config.pool.max_idle);
//! ```

pub mod global;
pub mod loader;
pub mod pool;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, reading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ptrcall config {0} does not exist")]
    FileNotFound(PathBuf),

    #[error("could not read ptrcall config: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed TOML in {file}: {error}")]
    Parse {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("invalid ptrcall config: {0}")]
    Invalid(String),

    #[error("{field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("cannot locate the home directory")]
    NoHomeDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use pool::{PoolConfig, PoolSection, DEFAULT_MAX_IDLE, MAX_IDLE_LIMIT};
pub use project::{LibrarySection, ProjectConfig};
