//! In-process protocol stack.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{Message, ProtocolStack, SendError, TRANSMIT_PGNS};

/// Protocol stack that lives entirely in memory.
///
/// Starts holding the address it was asked to claim, with the change flag
/// clear. [`Self::claim`] stands in for the bus forcing a re-claim.
/// Sent messages are logged and recorded instead of transmitted.
#[derive(Debug)]
pub struct SimulatedStack {
    address: AtomicU8,
    changed: AtomicBool,
    disconnected: AtomicBool,
    sent: Mutex<Vec<Message>>,
    sent_count: AtomicUsize,
}

impl SimulatedStack {
    /// Creates a stack that has claimed `preferred_address`.
    #[must_use]
    pub fn new(preferred_address: u8) -> Self {
        Self {
            address: AtomicU8::new(preferred_address),
            changed: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            sent_count: AtomicUsize::new(0),
        }
    }

    /// Completes a re-claim of `address` and raises the change flag.
    ///
    /// Re-claiming the address already held still raises the flag.
    pub fn claim(&self, address: u8) {
        self.address.store(address, Ordering::SeqCst);
        self.changed.store(true, Ordering::SeqCst);
        tracing::debug!("Simulated bus re-claim: now at address {address}");
    }

    /// Makes subsequent sends fail with [`SendError::Disconnected`].
    pub fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::SeqCst);
    }

    /// Returns the messages sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Message> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of messages sent so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent_count.load(Ordering::SeqCst)
    }
}

impl ProtocolStack for SimulatedStack {
    fn current_claimed_address(&self) -> u8 {
        self.address.load(Ordering::SeqCst)
    }

    fn address_changed_since_last_check(&self) -> bool {
        self.changed.swap(false, Ordering::SeqCst)
    }

    fn send(&self, message: &Message) -> Result<(), SendError> {
        let pgn = message.pgn();
        if !TRANSMIT_PGNS.contains(&pgn) {
            return Err(SendError::NotRegistered { pgn });
        }
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(SendError::Disconnected);
        }

        tracing::info!(
            "TX PGN {pgn} from {}: {message:?}",
            self.current_claimed_address()
        );
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*message);
        self.sent_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_hours(total_seconds: f64) -> Message {
        Message::EngineHours {
            instance: 0,
            total_seconds,
        }
    }

    #[test]
    fn starts_at_preferred_address_without_edge() {
        let stack = SimulatedStack::new(22);

        assert_eq!(stack.current_claimed_address(), 22);
        assert!(!stack.address_changed_since_last_check());
    }

    #[test]
    fn claim_raises_flag_once() {
        let stack = SimulatedStack::new(22);
        stack.claim(5);

        assert!(stack.address_changed_since_last_check());
        assert!(!stack.address_changed_since_last_check());
        assert_eq!(stack.current_claimed_address(), 5);
    }

    #[test]
    fn repeated_claims_before_check_collapse_into_one_edge() {
        let stack = SimulatedStack::new(22);
        stack.claim(5);
        stack.claim(6);
        stack.claim(7);

        assert!(stack.address_changed_since_last_check());
        assert!(!stack.address_changed_since_last_check());
        assert_eq!(stack.current_claimed_address(), 7);
    }

    #[test]
    fn send_records_message() {
        let stack = SimulatedStack::new(22);

        stack.send(&engine_hours(3_600.0)).unwrap();

        assert_eq!(stack.sent(), vec![engine_hours(3_600.0)]);
        assert_eq!(stack.sent_count(), 1);
    }

    #[test]
    fn disconnected_send_fails() {
        let stack = SimulatedStack::new(22);
        stack.set_disconnected(true);

        assert_eq!(
            stack.send(&engine_hours(1.0)),
            Err(SendError::Disconnected)
        );
        assert_eq!(stack.sent_count(), 0);
    }

    #[test]
    fn engine_hours_uses_engine_dynamic_pgn() {
        assert_eq!(engine_hours(0.0).pgn(), 127_489);
        assert!(TRANSMIT_PGNS.contains(&127_489));
    }

    #[test]
    fn send_error_messages() {
        assert_eq!(
            SendError::NotRegistered { pgn: 1 }.to_string(),
            "PGN 1 is not registered for transmission"
        );
        assert_eq!(SendError::Disconnected.to_string(), "Bus unavailable");
    }
}
