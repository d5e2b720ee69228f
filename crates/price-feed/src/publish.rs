//! Publish boundary between the engine and real-time transports

use tokio::sync::broadcast;
use tracing::debug;

use meme_core::FeedEvent;

/// Sink for per-cycle feed events
pub trait Publisher: Send + Sync {
    fn publish(&self, event: FeedEvent);
}

/// Fan-out publisher over a tokio broadcast channel.
///
/// Transports call `subscribe` once per connected client. Publishing with no
/// subscribers is not an error.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<FeedEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Publisher for BroadcastPublisher {
    fn publish(&self, event: FeedEvent) {
        let name = event.name();
        let size = event.len();
        match self.tx.send(event) {
            Ok(receivers) => debug!("Published {} ({} items) to {} subscribers", name, size, receivers),
            Err(_) => debug!("Published {} ({} items) with no subscribers", name, size),
        }
    }
}
