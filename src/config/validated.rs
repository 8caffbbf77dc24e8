//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    /// Path to the settings blob
    pub store_path: PathBuf,

    /// Bound on settings lock acquisition
    pub lock_timeout: Duration,

    /// Interval between address watch iterations
    pub poll_interval: Duration,

    /// Telemetry period
    pub telemetry_period: Duration,

    /// Engine-hours reading of the first telemetry message
    pub telemetry_start_hours: f64,

    /// Engine-hours increment per telemetry period
    pub telemetry_step_hours: f64,

    /// Address the simulated bus re-claims after startup, if any
    pub reclaim: Option<u8>,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reclaim_str = self
            .reclaim
            .map_or_else(|| "none".to_string(), |addr| addr.to_string());

        write!(
            f,
            "Config {{ store: {}, lock_timeout: {}ms, poll_interval: {}ms, telemetry: every {}s \
             from {}h step {}h, reclaim: {} }}",
            self.store_path.display(),
            self.lock_timeout.as_millis(),
            self.poll_interval.as_millis(),
            self.telemetry_period.as_secs(),
            self.telemetry_start_hours,
            self.telemetry_step_hours,
            reclaim_str,
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A duration is zero or longer than one day
    /// - Telemetry start or step is negative or not finite
    /// - The store path is empty
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let store_path = Self::resolve_store_path(cli, toml)?;

        let lock_timeout = Self::resolve_millis(
            cli.lock_timeout_ms,
            toml.and_then(|t| t.store.lock_timeout_ms),
            defaults::LOCK_TIMEOUT_MS,
            field::LOCK_TIMEOUT,
        )?;

        let poll_interval = Self::resolve_millis(
            cli.poll_interval_ms,
            toml.and_then(|t| t.watch.poll_interval_ms),
            defaults::POLL_INTERVAL_MS,
            field::POLL_INTERVAL,
        )?;

        let telemetry_period_secs = cli
            .telemetry_period
            .or_else(|| toml.and_then(|t| t.telemetry.period))
            .unwrap_or(defaults::TELEMETRY_PERIOD_SECS);
        if telemetry_period_secs == 0 {
            return Err(ConfigError::zero_duration(field::TELEMETRY_PERIOD));
        }
        if telemetry_period_secs > defaults::MAX_DURATION_SECS {
            return Err(ConfigError::duration_too_long(
                field::TELEMETRY_PERIOD,
                defaults::MAX_DURATION_SECS,
            ));
        }

        let (telemetry_start_hours, telemetry_step_hours) = Self::resolve_telemetry(toml)?;

        Ok(Self {
            store_path,
            lock_timeout,
            poll_interval,
            telemetry_period: Duration::from_secs(telemetry_period_secs),
            telemetry_start_hours,
            telemetry_step_hours,
            reclaim: cli.reclaim,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    fn resolve_store_path(cli: &Cli, toml: Option<&TomlConfig>) -> Result<PathBuf, ConfigError> {
        // CLI takes precedence
        let path = if let Some(ref path) = cli.store_file {
            path.clone()
        } else if let Some(path) = toml.and_then(|t| t.store.path.as_deref()) {
            expand_tilde(path)
        } else {
            return Ok(defaults::store_path());
        };

        if path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStorePath);
        }
        Ok(path)
    }

    fn resolve_millis(
        cli: Option<u64>,
        toml: Option<u64>,
        default: u64,
        field: &'static str,
    ) -> Result<Duration, ConfigError> {
        // Priority: CLI explicit > TOML > default
        let millis = cli.or(toml).unwrap_or(default);
        if millis == 0 {
            return Err(ConfigError::zero_duration(field));
        }
        if millis > defaults::MAX_DURATION_SECS * 1_000 {
            return Err(ConfigError::duration_too_long(field, defaults::MAX_DURATION_SECS));
        }
        Ok(Duration::from_millis(millis))
    }

    fn resolve_telemetry(toml: Option<&TomlConfig>) -> Result<(f64, f64), ConfigError> {
        let telemetry = toml.map(|t| &t.telemetry);

        let start = telemetry
            .and_then(|t| t.start_hours)
            .unwrap_or(defaults::TELEMETRY_START_HOURS);
        let step = telemetry
            .and_then(|t| t.step_hours)
            .unwrap_or(defaults::TELEMETRY_STEP_HOURS);

        if !start.is_finite() || start < 0.0 {
            return Err(ConfigError::InvalidTelemetry(
                "start_hours must be a non-negative finite number".to_string(),
            ));
        }

        if !step.is_finite() || step <= 0.0 {
            return Err(ConfigError::InvalidTelemetry(
                "step_hours must be a positive finite number".to_string(),
            ));
        }

        Ok((start, step))
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

// Helper functions

/// Expands a leading `~` to the home directory.
///
/// Paths without a leading `~`, or when no home directory is known, are
/// returned unchanged.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => &rest[1..],
        _ => return PathBuf::from(path),
    };

    dirs::home_dir().map_or_else(|| PathBuf::from(path), |home| home.join(rest))
}
