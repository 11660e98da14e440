//! Named broadcast channel for relocation events.

use std::sync::Arc;

use tokio::sync::broadcast;

use relocator_core::ChannelEvent;

/// Multiplexed push channel shared by every feature that reports events.
///
/// Cloning yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct EventChannel {
    name: Arc<str>,
    tx: broadcast::Sender<ChannelEvent>,
}

impl EventChannel {
    /// Create a channel buffering up to `capacity` events per subscriber.
    pub fn new(name: impl Into<Arc<str>>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            tx,
        }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.tx.subscribe()
    }

    /// Publish an event, returning how many subscribers will see it.
    pub fn publish(&self, event: ChannelEvent) -> usize {
        // No subscribers is not an error: nobody is watching yet.
        self.tx.send(event).unwrap_or(0)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let channel = EventChannel::new("relocation", 4);
        assert_eq!(channel.publish(ChannelEvent::progress(0, 1)), 0);

        let mut rx = channel.subscribe();
        assert_eq!(channel.subscriber_count(), 1);
        assert_eq!(channel.publish(ChannelEvent::progress(1, 1)), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event, ChannelEvent::progress(1, 1));
        assert_eq!(channel.name(), "relocation");
    }
}
