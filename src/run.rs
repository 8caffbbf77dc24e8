//! Application execution logic.
//!
//! This module contains the device runtime (address watch loop plus the
//! telemetry task) and the one-shot settings commands.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use hourmeter::config::ValidatedConfig;
use hourmeter::settings::{
    DEFAULT_DEVICE_ADDRESS, InitOutcome, PersistedConfig, RECORD_SIZE, SettingsError,
    SettingsManager,
};
use hourmeter::stack::SimulatedStack;
use hourmeter::store::{DurableStore, FileStore, StoreError};
use hourmeter::telemetry::TelemetryEmitter;
use hourmeter::watch::{AddressWatch, WatchOutcome};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// A settings operation failed.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// The settings store could not be read.
    #[error("Failed to read settings store: {0}")]
    Store(#[from] StoreError),

    /// Failed to render the stored record.
    #[error("Failed to render settings: {0}")]
    Render(#[from] serde_json::Error),
}

/// Runtime options extracted from validated config.
#[derive(Debug, Clone)]
struct RuntimeOptions {
    store_path: PathBuf,
    lock_timeout: Duration,
    poll_interval: Duration,
    telemetry_period: Duration,
    telemetry_start_hours: f64,
    telemetry_step_hours: f64,
    reclaim: Option<u8>,
}

impl From<&ValidatedConfig> for RuntimeOptions {
    fn from(config: &ValidatedConfig) -> Self {
        Self {
            store_path: config.store_path.clone(),
            lock_timeout: config.lock_timeout,
            poll_interval: config.poll_interval,
            telemetry_period: config.telemetry_period,
            telemetry_start_hours: config.telemetry_start_hours,
            telemetry_step_hours: config.telemetry_step_hours,
            reclaim: config.reclaim,
        }
    }
}

impl RuntimeOptions {
    fn emitter(&self) -> TelemetryEmitter {
        TelemetryEmitter::new()
            .with_start_hours(self.telemetry_start_hours)
            .with_step_hours(self.telemetry_step_hours)
    }
}

fn open_settings(path: &Path, lock_timeout: Duration) -> SettingsManager<FileStore> {
    SettingsManager::new(FileStore::new(path)).with_lock_timeout(lock_timeout)
}

/// Executes the device runtime until a shutdown signal arrives.
///
/// This function:
/// 1. Loads (or resets) the persisted settings
/// 2. Brings up the simulated stack at the persisted address
/// 3. Spawns the telemetry task
/// 4. Runs the address watch loop until shutdown (Ctrl+C / SIGTERM)
///
/// # Errors
///
/// Returns an error if the settings cannot be initialized.
///
/// # Coverage Note
///
/// This function is excluded from coverage because it requires
/// real signal handling.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    let options = RuntimeOptions::from(&config);
    let settings = Arc::new(open_settings(&options.store_path, options.lock_timeout));

    tracing::info!("Settings store: {}", options.store_path.display());
    run_device(settings, &options, shutdown_signal()).await
}

/// Runs the device against `settings` until `shutdown` completes.
async fn run_device<S, F>(
    settings: Arc<SettingsManager<S>>,
    options: &RuntimeOptions,
    shutdown: F,
) -> Result<(), RunError>
where
    S: DurableStore,
    F: Future<Output = ()>,
{
    log_init_outcome(&settings.init().await?);

    let address = settings.get_device_address();
    let stack = Arc::new(SimulatedStack::new(address));
    tracing::info!("Claimed device address {address}");

    let (stop_tx, stop_rx) = watch::channel(false);
    let telemetry = tokio::spawn(options.emitter().run(
        Arc::clone(&stack),
        options.telemetry_period,
        stop_rx,
    ));

    let mut address_watch = AddressWatch::new(Arc::clone(&stack), settings);
    run_watch_loop(
        &mut address_watch,
        options.poll_interval,
        options.reclaim,
        shutdown,
    )
    .await;

    let _ = stop_tx.send(true);
    if let Err(e) = telemetry.await {
        tracing::error!("Telemetry task failed: {e}");
    }

    Ok(())
}

/// Polls the watch every `poll_interval` until `shutdown` completes.
///
/// With `reclaim` set, the simulated bus re-claims that address once the
/// first poll has run.
async fn run_watch_loop<S, F>(
    address_watch: &mut AddressWatch<SimulatedStack, S>,
    poll_interval: Duration,
    mut reclaim: Option<u8>,
    shutdown: F,
) where
    S: DurableStore,
    F: Future<Output = ()>,
{
    let mut ticks = tokio::time::interval(poll_interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping...");
                return;
            }

            _ = ticks.tick() => {
                report(address_watch.poll_once().await);

                if let Some(address) = reclaim.take() {
                    tracing::info!("Simulating bus re-claim of address {address}");
                    address_watch.stack().claim(address);
                }
            }
        }
    }
}

fn log_init_outcome(outcome: &InitOutcome) {
    match outcome {
        InitOutcome::Loaded(record) => {
            tracing::info!("Loaded settings (device address {})", record.device_address);
        }
        InitOutcome::Reset { reason } => {
            tracing::warn!("Settings reset to defaults: {reason}");
        }
        InitOutcome::AlreadyInitialized => {
            tracing::debug!("Settings already initialized");
        }
    }
}

/// Logs the result of one watch iteration.
fn report(result: Result<WatchOutcome, SettingsError>) {
    match result {
        Ok(WatchOutcome::Idle) => {}
        Ok(WatchOutcome::Persisted(address)) => {
            tracing::info!("Address changed to {address}, persisted");
        }
        Ok(WatchOutcome::Unchanged(address)) => {
            tracing::debug!("Re-claimed address {address} already persisted");
        }
        Err(e) => {
            tracing::error!("Failed to persist address change (will retry): {e}");
        }
    }
}

/// Stored record as printed by `show`.
#[derive(Debug, Serialize)]
struct StoredRecord {
    path: String,
    valid: bool,
    #[serde(flatten)]
    record: PersistedConfig,
    /// Address the device requests at the next boot.
    boot_address: u8,
}

impl StoredRecord {
    fn read<S: DurableStore>(store: &S, path: &Path) -> Result<Self, StoreError> {
        let mut bytes = [0u8; RECORD_SIZE];
        store.load(&mut bytes)?;

        let record = PersistedConfig::from_bytes(&bytes);
        let valid = record.is_valid();
        Ok(Self {
            path: path.display().to_string(),
            valid,
            record,
            boot_address: if valid {
                record.device_address
            } else {
                DEFAULT_DEVICE_ADDRESS
            },
        })
    }

    fn render(&self, json: bool) -> Result<String, RunError> {
        if json {
            return Ok(serde_json::to_string_pretty(self)?);
        }

        let state = if self.valid { "valid" } else { "invalid" };
        Ok(format!(
            "store: {}\nsignature: {:#010x} ({state})\ndevice_address: {}\nboot_address: {}",
            self.path, self.record.signature, self.record.device_address, self.boot_address,
        ))
    }
}

/// Renders the stored record without modifying the medium.
///
/// # Errors
///
/// Returns an error if the store cannot be read or the record cannot be rendered.
pub fn show(config: &ValidatedConfig, json: bool) -> Result<String, RunError> {
    let store = FileStore::new(&config.store_path);
    StoredRecord::read(&store, store.path())?.render(json)
}

/// Stores and persists `address`.
///
/// # Errors
///
/// Returns an error if the settings cannot be initialized or saved.
pub async fn set_address(config: &ValidatedConfig, address: u8) -> Result<(), RunError> {
    let settings = open_settings(&config.store_path, config.lock_timeout);
    persist_address(&settings, address).await
}

async fn persist_address<S: DurableStore>(
    settings: &SettingsManager<S>,
    address: u8,
) -> Result<(), RunError> {
    log_init_outcome(&settings.init().await?);
    settings.set_device_address(address).await?;
    settings.save().await?;

    tracing::info!("Device address set to {address}");
    Ok(())
}

/// Resets the stored record to defaults.
///
/// # Errors
///
/// Returns an error if the default record cannot be written.
pub async fn reset(config: &ValidatedConfig) -> Result<(), RunError> {
    let settings = open_settings(&config.store_path, config.lock_timeout);
    settings.reset().await?;
    Ok(())
}

/// Returns a future that completes when a shutdown signal is received.
///
/// A handler that fails to install never fires; the other one still does.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
