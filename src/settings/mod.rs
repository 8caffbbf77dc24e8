//! Persisted device settings.
//!
//! This module provides:
//! - The on-medium record layout ([`PersistedConfig`], [`MAGIC`])
//! - The settings manager owning the in-memory mirror ([`SettingsManager`])
//! - Outcomes and errors of settings operations ([`InitOutcome`], [`SettingsError`])
//!
//! # Deferred Writes
//!
//! [`SettingsManager::set_device_address`] only updates memory. Durable
//! writes happen exclusively through [`SettingsManager::save`] and
//! [`SettingsManager::reset`], so frequent address renegotiation during bus
//! arbitration does not translate into frequent flash writes.

mod manager;
mod record;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

pub use manager::SettingsManager;
pub use record::{DEFAULT_DEVICE_ADDRESS, MAGIC, PersistedConfig, RECORD_SIZE};

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Result of [`SettingsManager::init`].
///
/// Models every way the mirror can come up:
/// - A valid record was found and loaded
/// - No valid record existed and defaults were written
/// - The manager had already been initialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// A valid record was loaded from storage.
    Loaded(PersistedConfig),

    /// The stored record was absent, unreadable or had a bad signature.
    /// Defaults were written in its place.
    Reset {
        /// Why the stored record was rejected (for logging).
        reason: String,
    },

    /// `init` had already succeeded; nothing was done.
    AlreadyInitialized,
}

impl InitOutcome {
    /// Returns `true` if this call wrote the default record.
    #[must_use]
    pub const fn is_reset(&self) -> bool {
        matches!(self, Self::Reset { .. })
    }
}

/// Errors returned by [`SettingsManager`] operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The operation requires a prior successful `init`.
    #[error("Settings used before initialization")]
    NotInitialized,

    /// The settings lock was not acquired within the configured bound.
    #[error("Timed out after {0:?} waiting for the settings lock")]
    LockTimeout(Duration),

    /// The durable store failed.
    #[error("Settings storage error: {0}")]
    Store(#[from] StoreError),
}
