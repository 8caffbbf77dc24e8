//! In-memory durable store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{DurableStore, StoreError, copy_blob};

#[derive(Debug, Default)]
struct Medium {
    blob: Mutex<Vec<u8>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

/// Memory-backed implementation of [`DurableStore`].
///
/// Clones share the same medium, so a clone handed to a fresh
/// [`crate::settings::SettingsManager`] behaves like the same flash after a
/// power cycle.
///
/// # Example
///
/// ```
/// use hourmeter::store::{DurableStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// let mut buf = [0xFFu8; 4];
/// store.load(&mut buf).unwrap();
/// assert_eq!(buf, [0, 0, 0, 0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    medium: Arc<Medium>,
    write_delay: Option<Duration>,
}

impl MemoryStore {
    /// Creates a never-written medium.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a medium already holding `blob`.
    #[must_use]
    pub fn with_blob(blob: Vec<u8>) -> Self {
        let store = Self::default();
        *store.lock_blob() = blob;
        store
    }

    /// Makes every write take `delay` before completing.
    ///
    /// Useful for holding the settings lock in timeout tests.
    #[must_use]
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.medium.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of the stored blob.
    #[must_use]
    pub fn blob(&self) -> Vec<u8> {
        self.lock_blob().clone()
    }

    /// Returns the number of successful writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.medium.writes.load(Ordering::SeqCst)
    }

    fn lock_blob(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        self.medium
            .blob
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl DurableStore for MemoryStore {
    fn load(&self, buf: &mut [u8]) -> Result<(), StoreError> {
        copy_blob(&self.lock_blob(), buf)
    }

    async fn store(&self, data: &[u8]) -> Result<(), StoreError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        if self.medium.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "injected write fault".to_string(),
            });
        }

        *self.lock_blob() = data.to_vec();
        self.medium.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
