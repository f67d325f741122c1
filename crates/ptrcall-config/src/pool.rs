//! Frame pool settings
//!
//! `PoolSection` is the `[pool]` table as written in a config file, where every
//! key is optional. `PoolConfig` is the resolved form handed to the runtime.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Idle frames kept for reuse when nothing else is configured.
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Upper bound for `max_idle`. A frame is a little over a kilobyte, so this
/// caps the idle footprint of one pool at roughly 5 MiB. The idle queue's
/// buffer is allocated for `max_idle` entries up front.
pub const MAX_IDLE_LIMIT: usize = 4_096;

/// `[pool]` table from ptrcall.toml or ~/.ptrcall/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct PoolSection {
    /// Maximum number of idle frames kept for reuse
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_idle: Option<usize>,

    /// Frames allocated up front when the pool is built
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prewarm: Option<usize>,

    /// Zero slot memory when a frame goes back to the pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrub_on_release: Option<bool>,
}

impl PoolSection {
    /// Overlay `other` on top of `self`; keys set in `other` win.
    pub fn merge(&mut self, other: &PoolSection) {
        if other.max_idle.is_some() {
            self.max_idle = other.max_idle;
        }
        if other.prewarm.is_some() {
            self.prewarm = other.prewarm;
        }
        if other.scrub_on_release.is_some() {
            self.scrub_on_release = other.scrub_on_release;
        }
    }

    /// Check the keys that are present
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(max_idle) = self.max_idle {
            if max_idle > MAX_IDLE_LIMIT {
                return Err(ConfigError::InvalidValue {
                    field: "pool.max_idle".to_string(),
                    reason: format!("must be at most {}, got {}", MAX_IDLE_LIMIT, max_idle),
                });
            }
        }
        Ok(())
    }

    /// Fill unset keys with defaults and check cross-field constraints
    pub fn resolve(&self) -> ConfigResult<PoolConfig> {
        self.validate()?;

        let config = PoolConfig {
            max_idle: self.max_idle.unwrap_or(DEFAULT_MAX_IDLE),
            prewarm: self.prewarm.unwrap_or(0),
            scrub_on_release: self.scrub_on_release.unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Resolved frame pool settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_idle: usize,
    pub prewarm: usize,
    pub scrub_on_release: bool,
}

impl PoolConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_idle > MAX_IDLE_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "pool.max_idle".to_string(),
                reason: format!("must be at most {}, got {}", MAX_IDLE_LIMIT, self.max_idle),
            });
        }
        if self.prewarm > self.max_idle {
            return Err(ConfigError::Invalid(format!(
                "pool.prewarm ({}) cannot exceed pool.max_idle ({})",
                self.prewarm, self.max_idle
            )));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: DEFAULT_MAX_IDLE,
            prewarm: 0,
            scrub_on_release: false,
        }
    }
}
