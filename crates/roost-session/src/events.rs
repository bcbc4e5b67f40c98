//! Event fan-out for session observers.

use roost_core::Event;
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast fan-out of session events to zero or more observers.
///
/// Emitting with no subscribers is fine; slow subscribers see
/// [`broadcast::error::RecvError::Lagged`] rather than blocking producers.
/// Events from one session arrive in emission order; no ordering is
/// guaranteed between sessions.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publish an event. Fire-and-forget.
    pub fn emit(&self, event: Event) {
        trace!(identity = %event.identity(), ?event, "Emitting event");
        // Err here only means nobody is listening.
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roost_core::BotStatus;

    #[tokio::test]
    async fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::new(16);
        bus.emit(Event::status("steve", BotStatus::Connecting, "Connecting..."));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(Event::status("steve", BotStatus::Connecting, "a"));
        bus.emit(Event::status("steve", BotStatus::Connected, "b"));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, Event::Status { status: BotStatus::Connecting, .. }));
        assert!(matches!(second, Event::Status { status: BotStatus::Connected, .. }));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_get_events() {
        let bus = EventBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(Event::error("steve", "boom"));

        assert!(matches!(a.recv().await.unwrap(), Event::Error { .. }));
        assert!(matches!(b.recv().await.unwrap(), Event::Error { .. }));
    }
}
