//! Profiler Configuration
//!
//! Process-wide switches for the profiler, resolved from environment
//! variables when the global profiler is first used.
//!
//! | Variable                 | Meaning                          | Default |
//! |--------------------------|----------------------------------|---------|
//! | `POINTPROF_ENABLED`      | Record checkpoints and traces    | `true`  |
//! | `POINTPROF_LOG_OUTPUT`   | Mirror events to the diagnostic log | `false` |
//! | `POINTPROF_MEMORY_LIMIT` | Memory ceiling (`128M`, `2G`, `-1`) | host |
//!
//! Without an explicit memory ceiling the limit of the host control
//! group is reported, when one can be read.

use std::env;

use log::warn;
use thiserror::Error;

/// Environment variable toggling recording.
pub const ENV_ENABLED: &str = "POINTPROF_ENABLED";

/// Environment variable toggling diagnostic log output.
pub const ENV_LOG_OUTPUT: &str = "POINTPROF_LOG_OUTPUT";

/// Environment variable holding the memory ceiling.
pub const ENV_MEMORY_LIMIT: &str = "POINTPROF_MEMORY_LIMIT";

/// Errors raised while reading configuration values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: expected a boolean")]
    InvalidFlag { key: String, value: String },

    #[error("invalid memory limit '{0}': expected e.g. 128M, 512K, 2G or -1")]
    InvalidMemoryLimit(String),
}

/// Runtime configuration for a profiler.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilerConfig {
    /// Whether checkpoints, traces and reports are active
    pub enabled: bool,
    /// Whether each event is also written to the diagnostic sink
    pub log_output: bool,
    /// Memory ceiling in megabytes, 0 to use the host ceiling
    pub memory_limit_mb: u64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_output: false,
            memory_limit_mb: 0,
        }
    }
}

impl ProfilerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration from the process environment, falling
    /// back to the defaults when a variable is malformed.
    pub fn from_env_or_default() -> Self {
        Self::from_lookup_or_default(|key| env::var(key).ok())
    }

    /// Like [`from_lookup`](Self::from_lookup), but logs a warning and
    /// returns the defaults on error.
    pub fn from_lookup_or_default<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(lookup).unwrap_or_else(|e| {
            warn!("Ignoring profiler environment configuration: {}", e);
            Self::default()
        })
    }

    /// Reads the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_ENABLED) {
            config.enabled = parse_flag(ENV_ENABLED, &value)?;
        }
        if let Some(value) = lookup(ENV_LOG_OUTPUT) {
            config.log_output = parse_flag(ENV_LOG_OUTPUT, &value)?;
        }
        if let Some(value) = lookup(ENV_MEMORY_LIMIT) {
            config.memory_limit_mb = parse_memory_limit(&value)?;
        }

        Ok(config)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parses a memory ceiling into megabytes.
///
/// A bare number is taken as megabytes; `K`, `M` and `G` suffixes are
/// accepted. Negative values mean unlimited and map to 0.
pub fn parse_memory_limit(value: &str) -> Result<u64, ConfigError> {
    let trimmed = value.trim();
    let invalid = || ConfigError::InvalidMemoryLimit(value.to_string());

    if trimmed.is_empty() {
        return Err(invalid());
    }
    if let Some(rest) = trimmed.strip_prefix('-') {
        rest.parse::<u64>().map_err(|_| invalid())?;
        return Ok(0);
    }

    let (digits, unit) = match trimmed.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&trimmed[..idx], Some(c)),
        _ => (trimmed, None),
    };
    let amount: u64 = digits.trim().parse().map_err(|_| invalid())?;

    match unit.map(|c| c.to_ascii_uppercase()) {
        None | Some('M') => Ok(amount),
        Some('K') => Ok(amount / 1024),
        Some('G') => Ok(amount.saturating_mul(1024)),
        Some(_) => Err(invalid()),
    }
}
