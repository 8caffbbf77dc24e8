//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use std::path::PathBuf;

use crate::telemetry::TelemetryEmitter;

/// File name of the settings blob inside the data directory.
pub const STORE_FILE_NAME: &str = "settings.bin";

/// Application directory under the platform data directory.
pub const APP_DIR: &str = "hourmeter";

/// Default interval between address watch iterations, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 10;

/// Default telemetry period in seconds.
pub const TELEMETRY_PERIOD_SECS: u64 = 8;

/// Default bound on settings lock acquisition, in milliseconds.
pub const LOCK_TIMEOUT_MS: u64 = 1_000;

/// Upper bound on every configured duration (one day), in seconds.
pub const MAX_DURATION_SECS: u64 = 86_400;

/// Default engine-hours reading of the first telemetry message.
pub const TELEMETRY_START_HOURS: f64 = TelemetryEmitter::DEFAULT_START_HOURS;

/// Default engine-hours increment per telemetry period.
pub const TELEMETRY_STEP_HOURS: f64 = TelemetryEmitter::DEFAULT_STEP_HOURS;

/// Default location of the settings blob.
///
/// Uses the platform data directory, falling back to the working directory
/// when none is known.
#[must_use]
pub fn store_path() -> PathBuf {
    dirs::data_local_dir().map_or_else(
        || PathBuf::from(STORE_FILE_NAME),
        |dir| dir.join(APP_DIR).join(STORE_FILE_NAME),
    )
}
