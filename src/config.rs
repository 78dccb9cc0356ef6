//! Sizing configuration for the backpressure primitives.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: fields set directly on [`SyncConfig`]
//! 2. **Environment variables**: values from `COOPSYNC_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: built-in defaults from [`SyncConfig::default()`]
//!
//! [`SyncConfig::from_env`] covers levels 2 and 4;
//! `SyncConfig::from_toml_with_env` covers levels 2 to 4.
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `COOPSYNC_MAX_CONCURRENT` | `usize` | `max_concurrent` |
//! | `COOPSYNC_QUEUE_CAPACITY` | `usize` | `queue_capacity` |

use crate::error::ConfigError;
use crate::sync::{BoundedQueue, Semaphore};

/// Environment variable name for the semaphore permit count.
pub const ENV_MAX_CONCURRENT: &str = "COOPSYNC_MAX_CONCURRENT";
/// Environment variable name for the queue capacity.
pub const ENV_QUEUE_CAPACITY: &str = "COOPSYNC_QUEUE_CAPACITY";

/// Default number of concurrently running tasks.
pub const DEFAULT_MAX_CONCURRENT: usize = 64;
/// Default number of buffered items.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Sizes for a semaphore / queue pair guarding one kind of work.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct SyncConfig {
    /// Initial permits of the semaphore. Must be non-zero.
    pub max_concurrent: usize,
    /// Capacity of the queue. Zero gives rendezvous hand-off.
    pub queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Defaults with environment overrides applied, then validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML settings with environment overrides applied on top, then
    /// validated once.
    #[cfg(feature = "config-file")]
    pub fn from_toml_with_env(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config = deserialize_toml(toml_str)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`from_toml_with_env`](Self::from_toml_with_env), reading the
    /// TOML from `path`.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file_with_env(path: &std::path::Path) -> Result<Self, ConfigError> {
        Self::from_toml_with_env(&read_toml_file(path)?)
    }

    /// Checks the configured values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds a semaphore with `max_concurrent` permits.
    #[must_use]
    pub fn semaphore(&self) -> Semaphore {
        Semaphore::new(self.max_concurrent)
    }

    /// Builds an open queue with `queue_capacity` slots.
    #[must_use]
    pub fn queue<T>(&self) -> BoundedQueue<T> {
        BoundedQueue::new(self.queue_capacity)
    }
}

/// Apply environment variable overrides to a [`SyncConfig`].
///
/// Only variables that are set are applied. A set but unparseable variable
/// is an error.
pub fn apply_env_overrides(config: &mut SyncConfig) -> Result<(), ConfigError> {
    if let Some(val) = read_env(ENV_MAX_CONCURRENT) {
        config.max_concurrent = parse_usize(ENV_MAX_CONCURRENT, &val)?;
    }
    if let Some(val) = read_env(ENV_QUEUE_CAPACITY) {
        config.queue_capacity = parse_usize(ENV_QUEUE_CAPACITY, &val)?;
    }
    Ok(())
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var: &'static str, val: &str) -> Result<usize, ConfigError> {
    val.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidEnv {
            var,
            expected: "unsigned integer",
            value: val.to_string(),
        })
}

/// Parse a TOML string into a [`SyncConfig`]. Missing fields keep defaults.
///
/// ```toml
/// max_concurrent = 16
/// queue_capacity = 0
/// ```
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<SyncConfig, ConfigError> {
    let config = deserialize_toml(toml_str)?;
    config.validate()?;
    Ok(config)
}

/// Read and parse a TOML file into a [`SyncConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<SyncConfig, ConfigError> {
    parse_toml_str(&read_toml_file(path)?)
}

#[cfg(feature = "config-file")]
fn deserialize_toml(toml_str: &str) -> Result<SyncConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::File(e.to_string()))
}

#[cfg(feature = "config-file")]
fn read_toml_file(path: &std::path::Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))
}
