//! Durable byte-blob storage for the settings record.
//!
//! This module provides the contract the settings manager persists through,
//! plus two implementations:
//! - [`FileStore`]: file-backed, atomic replace on every write
//! - [`MemoryStore`]: in-memory medium with fault injection, for tests and simulations

mod file;
mod memory;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::future::Future;
use std::io;

use thiserror::Error;

/// Errors raised by a [`DurableStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the medium failed.
    #[error("Failed to read from storage: {0}")]
    Read(#[source] io::Error),

    /// Writing the medium failed.
    #[error("Failed to write to storage: {0}")]
    Write(#[source] io::Error),

    /// The stored blob does not have the expected fixed size.
    ///
    /// A partially written blob must never be interpreted as a record.
    #[error("Stored blob has {actual} bytes, expected {expected}")]
    Truncated {
        /// Size the caller asked for
        expected: usize,
        /// Size found on the medium
        actual: usize,
    },

    /// The medium rejected the operation (hardware fault, medium full).
    #[error("Storage unavailable: {reason}")]
    Unavailable {
        /// Description of the fault
        reason: String,
    },
}

/// Abstraction over a non-volatile medium holding one fixed-size blob.
///
/// Implementations must guarantee:
/// - A never-written medium loads as a zero-filled buffer
/// - A blob whose size differs from the requested size is reported as
///   [`StoreError::Truncated`], never partially copied
/// - `store` replaces the whole blob atomically: after a crash, `load`
///   returns either the previous blob or the new one
pub trait DurableStore: Send + Sync {
    /// Fills `buf` with the stored blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read or the stored blob
    /// does not match `buf.len()`.
    fn load(&self, buf: &mut [u8]) -> Result<(), StoreError>;

    /// Replaces the stored blob with `data`.
    ///
    /// Completes only once the data is durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the write does not complete.
    fn store(&self, data: &[u8]) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Copies a stored blob into `buf`, enforcing the fixed-size contract.
///
/// An empty blob is the erased/never-written medium and reads as zeros.
fn copy_blob(blob: &[u8], buf: &mut [u8]) -> Result<(), StoreError> {
    if blob.is_empty() {
        buf.fill(0);
        return Ok(());
    }

    if blob.len() != buf.len() {
        return Err(StoreError::Truncated {
            expected: buf.len(),
            actual: blob.len(),
        });
    }

    buf.copy_from_slice(blob);
    Ok(())
}
