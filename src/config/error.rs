//! Error types for configuration parsing and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration operations.
///
/// Covers errors from parsing, validation, and file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to write configuration file (for init command).
    #[error("Failed to write config file '{}': {source}", path.display())]
    FileWrite {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid duration value (zero or too long).
    #[error("Invalid duration for {field}: {reason}")]
    InvalidDuration {
        /// Name of the field
        field: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Invalid telemetry configuration.
    #[error("Invalid telemetry configuration: {0}")]
    InvalidTelemetry(String),

    /// Empty settings store path.
    #[error("Settings store path must not be empty")]
    EmptyStorePath,
}

/// Well-known field names for `InvalidDuration` errors.
pub mod field {
    /// The watch interval field.
    pub const POLL_INTERVAL: &str = "poll_interval_ms";
    /// The telemetry period field.
    pub const TELEMETRY_PERIOD: &str = "telemetry.period";
    /// The lock timeout field.
    pub const LOCK_TIMEOUT: &str = "lock_timeout_ms";
}

impl ConfigError {
    /// Creates an `InvalidDuration` error for a zero value.
    #[must_use]
    pub fn zero_duration(field: &'static str) -> Self {
        Self::InvalidDuration {
            field,
            reason: "must be greater than 0".to_string(),
        }
    }

    /// Creates an `InvalidDuration` error for a value above `max_secs`.
    #[must_use]
    pub fn duration_too_long(field: &'static str, max_secs: u64) -> Self {
        Self::InvalidDuration {
            field,
            reason: format!("must not exceed {max_secs}s"),
        }
    }
}
