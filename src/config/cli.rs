//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Hour meter: NMEA2000 engine hour meter runtime
///
/// Keeps the device address in crash-consistent storage, persists addresses
/// re-claimed on the bus and emits engine-hours telemetry.
#[derive(Debug, Parser)]
#[command(name = "hourmeter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the settings store file
    #[arg(long = "store-file", global = true)]
    pub store_file: Option<PathBuf>,

    /// Maximum wait for the settings lock, in milliseconds
    #[arg(long = "lock-timeout-ms", global = true)]
    pub lock_timeout_ms: Option<u64>,

    /// Interval between address checks, in milliseconds
    #[arg(long = "poll-interval-ms")]
    pub poll_interval_ms: Option<u64>,

    /// Telemetry period in seconds
    #[arg(long = "telemetry-period")]
    pub telemetry_period: Option<u64>,

    /// Make the simulated bus re-claim this address after startup
    #[arg(long, value_name = "ADDR")]
    pub reclaim: Option<u8>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Subcommands for hourmeter
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the device (default)
    Run,

    /// Print the stored settings record
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Store and persist a device address
    SetAddress {
        /// The NMEA2000 source address (0-255)
        address: u8,
    },

    /// Reset the stored settings to defaults
    Reset,

    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "hourmeter.toml")]
        output: PathBuf,
    },
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns the subcommand to execute, `run` when none was given.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Some(Command::Init { .. }))
    }
}
