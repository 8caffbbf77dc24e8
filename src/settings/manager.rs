//! Settings manager owning the in-memory mirror of the persisted record.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use super::record::{DEFAULT_DEVICE_ADDRESS, MAGIC, PersistedConfig, RECORD_SIZE};
use super::{InitOutcome, SettingsError};
use crate::store::DurableStore;

/// Mirror fields that only change under the lock.
#[derive(Debug, Default)]
struct Mirror {
    signature: u32,
    /// Address known to be on the medium, `None` until a load or write succeeds.
    persisted: Option<u8>,
}

/// Owner of the persisted settings and their in-memory mirror.
///
/// One instance per device, shared by reference (typically in an `Arc`)
/// between the tasks that need it.
///
/// # Concurrency
///
/// - The device address lives in an atomic, so [`Self::get_device_address`]
///   never blocks and never observes a torn value.
/// - Mutation and persistence go through an async mutex acquired with a
///   bounded wait; exceeding it yields [`SettingsError::LockTimeout`].
/// - The lock is held across the storage write, so a save always writes a
///   consistent snapshot and concurrent saves are serialized.
///
/// # Example
///
/// ```
/// use hourmeter::settings::SettingsManager;
/// use hourmeter::store::MemoryStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let settings = SettingsManager::new(MemoryStore::new());
/// settings.init().await.unwrap();
/// assert_eq!(settings.get_device_address(), 22);
///
/// settings.set_device_address(37).await.unwrap();
/// settings.save().await.unwrap();
/// # }
/// ```
#[derive(Debug)]
pub struct SettingsManager<S> {
    store: S,
    mirror: Mutex<Mirror>,
    device_address: AtomicU8,
    initialized: AtomicBool,
    lock_timeout: Duration,
}

impl<S: DurableStore> SettingsManager<S> {
    /// Default bound on lock acquisition.
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

    /// Creates an uninitialized manager over `store`.
    ///
    /// Until [`Self::init`] succeeds, reads return [`DEFAULT_DEVICE_ADDRESS`]
    /// and writes fail with [`SettingsError::NotInitialized`].
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            mirror: Mutex::new(Mirror::default()),
            device_address: AtomicU8::new(DEFAULT_DEVICE_ADDRESS),
            initialized: AtomicBool::new(false),
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Sets the bound on lock acquisition.
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Returns the configured lock bound.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Returns `true` once [`Self::init`] or [`Self::reset`] has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Loads the persisted record into the mirror.
    ///
    /// Idempotent: once it has succeeded, further calls return
    /// [`InitOutcome::AlreadyInitialized`] without touching storage.
    ///
    /// A missing, unreadable or wrongly signed record is replaced by the
    /// defaults, which are written immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired in time or the default
    /// record cannot be written. The manager then stays uninitialized and a
    /// later call retries.
    pub async fn init(&self) -> Result<InitOutcome, SettingsError> {
        let mut mirror = self.lock().await?;

        if self.is_initialized() {
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let mut bytes = [0u8; RECORD_SIZE];
        let reason = match self.store.load(&mut bytes) {
            Ok(()) => {
                let record = PersistedConfig::from_bytes(&bytes);
                if record.is_valid() {
                    mirror.signature = record.signature;
                    mirror.persisted = Some(record.device_address);
                    self.device_address
                        .store(record.device_address, Ordering::Release);
                    self.initialized.store(true, Ordering::Release);

                    tracing::debug!("Loaded settings: device address {}", record.device_address);
                    return Ok(InitOutcome::Loaded(record));
                }
                format!(
                    "signature mismatch (expected {MAGIC:#010x}, found {:#010x})",
                    record.signature
                )
            }
            Err(e) => format!("unreadable record ({e})"),
        };

        self.reset_locked(&mut mirror).await?;
        Ok(InitOutcome::Reset { reason })
    }

    /// Restores the defaults and writes them synchronously.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired in time or the write
    /// fails. On a failed write the mirror already holds the defaults but the
    /// medium keeps its previous content.
    pub async fn reset(&self) -> Result<(), SettingsError> {
        let mut mirror = self.lock().await?;
        self.reset_locked(&mut mirror).await
    }

    /// Returns the device address from the mirror. Never blocks.
    #[must_use]
    pub fn get_device_address(&self) -> u8 {
        self.device_address.load(Ordering::Acquire)
    }

    /// Returns the device address last written to (or loaded from) storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired in time.
    pub async fn persisted_device_address(&self) -> Result<Option<u8>, SettingsError> {
        Ok(self.lock().await?.persisted)
    }

    /// Updates the device address in memory only.
    ///
    /// Call [`Self::save`] to make the change durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager is uninitialized or the lock cannot be
    /// acquired in time.
    pub async fn set_device_address(&self, address: u8) -> Result<(), SettingsError> {
        let _mirror = self.lock().await?;
        self.ensure_initialized()?;

        self.device_address.store(address, Ordering::Release);
        Ok(())
    }

    /// Writes the whole mirror to storage, waiting for the write to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager is uninitialized, the lock cannot be
    /// acquired in time or the write fails.
    pub async fn save(&self) -> Result<(), SettingsError> {
        let mut mirror = self.lock().await?;
        self.ensure_initialized()?;

        let record = PersistedConfig {
            signature: mirror.signature,
            device_address: self.get_device_address(),
        };
        self.store.store(&record.to_bytes()).await?;
        mirror.persisted = Some(record.device_address);

        tracing::debug!("Saved settings: device address {}", record.device_address);
        Ok(())
    }

    /// Stores `address` in the mirror and persists it unless the medium
    /// already holds it.
    ///
    /// The comparison and the write happen under one lock acquisition, so a
    /// concurrent `save` cannot slip in between them.
    ///
    /// Returns `true` if a write was performed.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager is uninitialized, the lock cannot be
    /// acquired in time or the write fails. After a failed write the mirror
    /// holds `address` and the medium keeps its previous content.
    pub async fn commit_device_address(&self, address: u8) -> Result<bool, SettingsError> {
        let mut mirror = self.lock().await?;
        self.ensure_initialized()?;

        self.device_address.store(address, Ordering::Release);
        if mirror.persisted == Some(address) {
            return Ok(false);
        }

        let record = PersistedConfig {
            signature: mirror.signature,
            device_address: address,
        };
        self.store.store(&record.to_bytes()).await?;
        mirror.persisted = Some(address);

        tracing::debug!("Committed device address {address}");
        Ok(true)
    }

    async fn lock(&self) -> Result<MutexGuard<'_, Mirror>, SettingsError> {
        tokio::time::timeout(self.lock_timeout, self.mirror.lock())
            .await
            .map_err(|_| SettingsError::LockTimeout(self.lock_timeout))
    }

    fn ensure_initialized(&self) -> Result<(), SettingsError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(SettingsError::NotInitialized)
        }
    }

    async fn reset_locked(&self, mirror: &mut Mirror) -> Result<(), SettingsError> {
        let record = PersistedConfig::default();

        mirror.signature = record.signature;
        self.device_address
            .store(record.device_address, Ordering::Release);

        self.store.store(&record.to_bytes()).await?;
        mirror.persisted = Some(record.device_address);
        self.initialized.store(true, Ordering::Release);

        tracing::info!(
            "Settings reset to defaults (device address {})",
            record.device_address
        );
        Ok(())
    }
}
