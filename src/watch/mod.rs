//! Address watch loop.
//!
//! Remembers addresses the protocol stack re-claimed on its own (after losing
//! arbitration for the persisted one), so the next boot asks for the same
//! address instead of renegotiating from scratch.
//!
//! # Commit Semantics
//!
//! The stack's change flag clears on read. A persist that fails after the
//! flag was consumed is therefore kept as a pending edge inside
//! [`AddressWatch`] and retried on every following iteration until it
//! succeeds, using whatever address the stack holds at that point.

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

use std::sync::Arc;

use crate::settings::{SettingsError, SettingsManager};
use crate::stack::ProtocolStack;
use crate::store::DurableStore;

/// What one watch iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// No address change to handle.
    Idle,

    /// The new address was stored and saved.
    Persisted(u8),

    /// The stack re-claimed the address already on the medium; nothing written.
    Unchanged(u8),
}

/// Polls a [`ProtocolStack`] for address changes and persists them.
///
/// Driven externally: call [`Self::poll_once`] from the task pumping the
/// stack.
pub struct AddressWatch<P, S> {
    stack: Arc<P>,
    settings: Arc<SettingsManager<S>>,
    /// An edge was consumed but its address is not yet on the medium.
    pending: bool,
}

impl<P, S> AddressWatch<P, S>
where
    P: ProtocolStack,
    S: DurableStore,
{
    /// Creates a watch over `stack` writing through `settings`.
    #[must_use]
    pub const fn new(stack: Arc<P>, settings: Arc<SettingsManager<S>>) -> Self {
        Self {
            stack,
            settings,
            pending: false,
        }
    }

    /// Returns `true` while a consumed edge still awaits a successful save.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns the stack being watched.
    #[must_use]
    pub const fn stack(&self) -> &Arc<P> {
        &self.stack
    }

    /// Runs one iteration.
    ///
    /// # Errors
    ///
    /// Returns the settings error that prevented the address from being
    /// saved. The edge stays pending and the next call retries it.
    pub async fn poll_once(&mut self) -> Result<WatchOutcome, SettingsError> {
        let edge = self.stack.address_changed_since_last_check();
        if !edge && !self.pending {
            return Ok(WatchOutcome::Idle);
        }

        if edge && self.pending {
            tracing::debug!("New address change while previous one is still uncommitted");
        }
        self.pending = true;

        let address = self.stack.current_claimed_address();
        let outcome = self.commit(address).await?;
        self.pending = false;
        Ok(outcome)
    }

    async fn commit(&self, address: u8) -> Result<WatchOutcome, SettingsError> {
        if self.settings.commit_device_address(address).await? {
            Ok(WatchOutcome::Persisted(address))
        } else {
            Ok(WatchOutcome::Unchanged(address))
        }
    }
}
