//! In-process push channel.

use async_trait::async_trait;
use futures::future;
use futures::stream::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::counters::ViewCount;
use crate::error::PushError;
use crate::push::{PushChannel, Subscription, ViewsUpdated};

/// Fans counts out to every subscriber in the same process.
///
/// A subscriber that falls more than `capacity` events behind skips the
/// missed ones and carries on with the newest.
///
/// ```rust
/// use contavisite::counters::ViewCount;
/// use contavisite::push::BroadcastChannel;
///
/// let channel = BroadcastChannel::new(16);
/// assert_eq!(channel.publish(ViewCount::new(1)), 0); // nobody listening yet
/// ```
#[derive(Debug, Clone)]
pub struct BroadcastChannel {
    sender: broadcast::Sender<ViewCount>,
}

impl BroadcastChannel {
    /// Creates a channel buffering up to `capacity` counts per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        BroadcastChannel { sender }
    }

    /// Publishes a count and returns how many subscribers will receive it.
    pub fn publish(&self, count: ViewCount) -> usize {
        self.sender.send(count).unwrap_or(0)
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl PushChannel for BroadcastChannel {
    async fn subscribe(&self) -> Result<Subscription, PushError> {
        let events = BroadcastStream::new(self.sender.subscribe()).filter_map(|item| {
            future::ready(match item {
                Ok(count) => Some(Ok(ViewsUpdated { count })),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    debug!(skipped, "push subscriber lagged");
                    None
                }
            })
        });
        Ok(Subscription::new(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_published_counts() {
        let channel = BroadcastChannel::new(8);
        let mut sub = channel.subscribe().await.unwrap();
        assert_eq!(channel.subscriber_count(), 1);

        assert_eq!(channel.publish(ViewCount::new(43)), 1);
        assert_eq!(channel.publish(ViewCount::new(43)), 1);

        assert_eq!(sub.next().await.unwrap().unwrap().count, ViewCount::new(43));
        assert_eq!(sub.next().await.unwrap().unwrap().count, ViewCount::new(43));
    }

    #[tokio::test]
    async fn test_dropping_subscription_unsubscribes() {
        let channel = BroadcastChannel::new(8);
        let sub = channel.subscribe().await.unwrap();
        drop(sub);
        assert_eq!(channel.subscriber_count(), 0);
        assert_eq!(channel.publish(ViewCount::new(1)), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_to_newest() {
        let channel = BroadcastChannel::new(2);
        let mut sub = channel.subscribe().await.unwrap();
        for n in 1..=5 {
            channel.publish(ViewCount::new(n));
        }
        assert_eq!(sub.next().await.unwrap().unwrap().count, ViewCount::new(4));
        assert_eq!(sub.next().await.unwrap().unwrap().count, ViewCount::new(5));
    }

    #[tokio::test]
    async fn test_stream_ends_when_channel_dropped() {
        let channel = BroadcastChannel::new(2);
        let mut sub = channel.subscribe().await.unwrap();
        drop(channel);
        assert!(sub.next().await.is_none());
    }
}
