//! Periodic engine-hours telemetry.
//!
//! Runs as its own task, independent of the settings: every period it hands
//! the protocol stack the current engine-hours reading, then advances it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, interval_at};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;

use crate::stack::{Message, ProtocolStack, SendError};

const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Synthetic engine-hours source.
///
/// # Example
///
/// ```
/// use hourmeter::stack::Message;
/// use hourmeter::telemetry::TelemetryEmitter;
///
/// let mut emitter = TelemetryEmitter::new();
/// let first = emitter.next_message();
/// assert_eq!(
///     first,
///     Message::EngineHours { instance: 0, total_seconds: 1000.0 * 3600.0 }
/// );
/// assert_eq!(emitter.engine_hours(), 1001.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryEmitter {
    engine_hours: f64,
    step_hours: f64,
    instance: u8,
}

impl TelemetryEmitter {
    /// Default emission period.
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(8);

    /// Default reading of the first message, in hours.
    pub const DEFAULT_START_HOURS: f64 = 1_000.0;

    /// Default increment per period, in hours.
    pub const DEFAULT_STEP_HOURS: f64 = 1.0;

    /// Creates an emitter with default start and step for engine instance 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            engine_hours: Self::DEFAULT_START_HOURS,
            step_hours: Self::DEFAULT_STEP_HOURS,
            instance: 0,
        }
    }

    /// Sets the reading of the next message.
    #[must_use]
    pub const fn with_start_hours(mut self, hours: f64) -> Self {
        self.engine_hours = hours;
        self
    }

    /// Sets the increment applied after each message.
    #[must_use]
    pub const fn with_step_hours(mut self, hours: f64) -> Self {
        self.step_hours = hours;
        self
    }

    /// Returns the reading the next message will carry.
    #[must_use]
    pub const fn engine_hours(&self) -> f64 {
        self.engine_hours
    }

    /// Builds the message for the current reading and advances it.
    pub fn next_message(&mut self) -> Message {
        let message = Message::EngineHours {
            instance: self.instance,
            total_seconds: self.engine_hours * SECONDS_PER_HOUR,
        };
        self.engine_hours += self.step_hours;
        message
    }

    /// Sends one reading through `stack`.
    ///
    /// The reading advances even when the send fails.
    ///
    /// # Errors
    ///
    /// Returns the stack's error if the message could not be queued.
    pub fn emit<P: ProtocolStack + ?Sized>(&mut self, stack: &P) -> Result<Message, SendError> {
        let message = self.next_message();
        stack.send(&message)?;
        Ok(message)
    }

    /// Emits every `period` until `shutdown` changes or its sender is dropped.
    ///
    /// The first message goes out one full period after the call. A period too
    /// large to schedule emits nothing.
    pub async fn run<P: ProtocolStack>(
        mut self,
        stack: Arc<P>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let Some(start) = Instant::now().checked_add(period) else {
            tracing::error!("Telemetry period {period:?} is out of range, not emitting");
            return;
        };
        let mut ticks = IntervalStream::new(interval_at(start, period));

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    tracing::debug!("Telemetry task stopping");
                    return;
                }

                tick = ticks.next() => {
                    if tick.is_none() {
                        return;
                    }
                    match self.emit(stack.as_ref()) {
                        Ok(message) => tracing::debug!("Telemetry sent: {message:?}"),
                        Err(e) => tracing::warn!("Telemetry send failed: {e}"),
                    }
                }
            }
        }
    }
}

impl Default for TelemetryEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::SimulatedStack;

    fn total_seconds(message: &Message) -> f64 {
        match message {
            Message::EngineHours { total_seconds, .. } => *total_seconds,
        }
    }

    #[test]
    fn readings_increase_by_step() {
        let mut emitter = TelemetryEmitter::new()
            .with_start_hours(10.0)
            .with_step_hours(0.5);

        let readings: Vec<f64> = (0..3)
            .map(|_| total_seconds(&emitter.next_message()))
            .collect();

        assert_eq!(readings, vec![36_000.0, 37_800.0, 39_600.0]);
    }

    #[test]
    fn emit_sends_through_stack() {
        let stack = SimulatedStack::new(22);
        let mut emitter = TelemetryEmitter::new();

        emitter.emit(&stack).unwrap();
        emitter.emit(&stack).unwrap();

        let sent: Vec<f64> = stack.sent().iter().map(total_seconds).collect();
        assert_eq!(sent, vec![3_600_000.0, 3_603_600.0]);
    }

    #[test]
    fn failed_send_still_advances_reading() {
        let stack = SimulatedStack::new(22);
        stack.set_disconnected(true);
        let mut emitter = TelemetryEmitter::new();

        assert_eq!(emitter.emit(&stack), Err(SendError::Disconnected));
        assert!((emitter.engine_hours() - 1_001.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_matches_new() {
        assert_eq!(TelemetryEmitter::default(), TelemetryEmitter::new());
        assert_eq!(TelemetryEmitter::DEFAULT_PERIOD, Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn run_emits_once_per_period() {
        let stack = Arc::new(SimulatedStack::new(22));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(TelemetryEmitter::new().run(
            Arc::clone(&stack),
            Duration::from_secs(8),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_secs(25)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(stack.sent_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn run_waits_a_full_period_before_first_message() {
        let stack = Arc::new(SimulatedStack::new(22));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(TelemetryEmitter::new().run(
            Arc::clone(&stack),
            Duration::from_secs(8),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(stack.sent_count(), 0);

        drop(shutdown_tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn run_with_unschedulable_period_returns_without_sending() {
        let stack = Arc::new(SimulatedStack::new(22));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(TelemetryEmitter::new().run(
            Arc::clone(&stack),
            Duration::MAX,
            shutdown_rx,
        ));

        task.await.unwrap();
        assert_eq!(stack.sent_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_survives_send_failures() {
        let stack = Arc::new(SimulatedStack::new(22));
        stack.set_disconnected(true);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(TelemetryEmitter::new().run(
            Arc::clone(&stack),
            Duration::from_secs(1),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        stack.set_disconnected(false);
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(stack.sent_count(), 1);
    }
}
