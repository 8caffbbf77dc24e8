//! Protocol stack contract consumed by the device tasks.
//!
//! This module provides:
//! - The outbound message type ([`Message`]) and its PGN registry ([`TRANSMIT_PGNS`])
//! - The stack abstraction ([`ProtocolStack`]) and its send error ([`SendError`])
//! - An in-process stack for simulation and tests ([`SimulatedStack`])
//!
//! Frame encoding and address-claim arbitration belong to the real stack
//! behind [`ProtocolStack`]; nothing here models them.

mod simulated;

pub use simulated::SimulatedStack;

use thiserror::Error;

/// PGN of the atmospheric pressure message.
pub const PGN_ATMOSPHERIC_PRESSURE: u32 = 130_310;

/// PGN of the engine parameters (dynamic) message.
pub const PGN_ENGINE_DYNAMIC: u32 = 127_489;

/// PGNs this device announces as transmitted.
pub const TRANSMIT_PGNS: &[u32] = &[PGN_ATMOSPHERIC_PRESSURE, PGN_ENGINE_DYNAMIC];

/// Outbound message handed to the stack for transmission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    /// Engine dynamic parameters carrying only the total engine hours.
    EngineHours {
        /// Engine instance on the bus.
        instance: u8,
        /// Total engine running time in seconds.
        total_seconds: f64,
    },
}

impl Message {
    /// Returns the PGN the message is sent under.
    #[must_use]
    pub const fn pgn(&self) -> u32 {
        match self {
            Self::EngineHours { .. } => PGN_ENGINE_DYNAMIC,
        }
    }
}

/// Error returned when the stack cannot queue a message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The message PGN is not in the stack's transmit list.
    #[error("PGN {pgn} is not registered for transmission")]
    NotRegistered {
        /// The rejected PGN
        pgn: u32,
    },

    /// The bus is not available.
    #[error("Bus unavailable")]
    Disconnected,
}

/// Network protocol stack as seen by the device tasks.
///
/// # Address Change Flag
///
/// [`Self::address_changed_since_last_check`] is edge-triggered: it returns
/// `true` once per completed re-claim and clears itself on read, whatever
/// the caller does afterwards.
pub trait ProtocolStack: Send + Sync {
    /// Returns the source address the stack currently holds on the bus.
    fn current_claimed_address(&self) -> u8;

    /// Returns `true` exactly once after each address change, then clears.
    fn address_changed_since_last_check(&self) -> bool;

    /// Queues a message for transmission.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    fn send(&self, message: &Message) -> Result<(), SendError>;
}
