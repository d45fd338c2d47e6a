// ABOUTME: Per-consumer subscription handle over the shared agent event feed.
// ABOUTME: Wraps a broadcast receiver; dropping the handle detaches the consumer.

use crate::AgentEvent;
use tokio::sync::broadcast;

/// Buffered events per subscription before the oldest are dropped
const FEED_CAPACITY: usize = 2048;

/// The shared multiplexed event feed a runtime publishes into.
///
/// Every concurrently running turn opens its own [`EventSubscription`] and
/// filters to its session; the feed itself carries all sessions.
#[derive(Clone)]
pub struct EventFeed {
    tx: broadcast::Sender<AgentEvent>,
}

impl EventFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Open a new consumer. Receives only events emitted after this call,
    /// so subscribe before firing the prompt.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Publish an event to all open subscriptions.
    ///
    /// Sending with no subscribers is not an error; the event is dropped.
    pub fn emit(&self, event: AgentEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of currently open subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// One consumer's handle on the event feed.
pub struct EventSubscription {
    rx: broadcast::Receiver<AgentEvent>,
}

impl EventSubscription {
    /// Receive the next event, or None once the feed is closed.
    ///
    /// A slow consumer that falls behind the feed buffer skips the gap and
    /// keeps receiving; the skip is logged.
    pub async fn recv(&mut self) -> Option<AgentEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscription lagged, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Detach from the feed. Dropping the handle has the same effect, which
    /// keeps release deterministic on error and timeout exits too.
    pub fn close(self) {}
}
