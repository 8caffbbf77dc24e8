//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Settings storage section
    #[serde(default)]
    pub store: StoreSection,

    /// Address watch section
    #[serde(default)]
    pub watch: WatchSection,

    /// Telemetry section
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

/// Settings storage section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Path to the settings blob (`~` expands to the home directory)
    pub path: Option<String>,

    /// Maximum wait for the settings lock, in milliseconds
    pub lock_timeout_ms: Option<u64>,
}

/// Address watch section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Interval between address checks, in milliseconds
    pub poll_interval_ms: Option<u64>,
}

/// Telemetry section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Period in seconds
    pub period: Option<u64>,

    /// Engine-hours reading of the first message
    pub start_hours: Option<f64>,

    /// Engine-hours increment per period
    pub step_hours: Option<f64>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# Hour Meter Configuration File

[store]
# Path to the settings blob (default: platform data dir, hourmeter/settings.bin)
# path = "~/.local/share/hourmeter/settings.bin"

# Maximum wait for the settings lock in milliseconds (default: 1000)
# lock_timeout_ms = 1000

[watch]
# Interval between address change checks in milliseconds (default: 10)
poll_interval_ms = 10

[telemetry]
# Period in seconds (default: 8)
period = 8

# Engine-hours reading of the first message (default: 1000.0)
# start_hours = 1000.0

# Engine-hours increment per period (default: 1.0)
# step_hours = 1.0
"#
    .to_string()
}
