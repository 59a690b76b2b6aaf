//! Fan-out of [`PortEvent`]s to subscribers.
//!
//! Backed by a [`tokio::sync::broadcast`] channel, so every subscriber sees
//! every event sent after it subscribed. A subscriber that falls more than
//! the channel capacity behind receives
//! [`broadcast::error::RecvError::Lagged`] and skips to the oldest retained
//! event.

use portcall_types::PortEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Minimum channel capacity; tokio rejects a zero-capacity channel.
const MIN_CAPACITY: usize = 1;

/// Broadcast publisher for engine events.
#[derive(Debug, Clone)]
pub struct EventNotifier {
    tx: broadcast::Sender<PortEvent>,
}

impl EventNotifier {
    /// Create a notifier retaining up to `capacity` unread events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(MIN_CAPACITY));
        Self { tx }
    }

    /// Subscribe to every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PortEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event.
    ///
    /// Returns the number of subscribers that received it; zero when nobody
    /// is listening, which is not an error.
    pub fn emit(&self, event: PortEvent) -> usize {
        debug!(
            port_id = %event.port_id(),
            kind = event.kind(),
            "Emitting port event"
        );
        // send only fails when there are no receivers.
        self.tx.send(event).unwrap_or(0)
    }
}
