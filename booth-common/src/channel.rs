//! Typed pub/sub channel abstraction
//!
//! The Fan-Out Hub (WebSocket) and Cross-Tab Sync (same-origin broadcast) are
//! two transports for the same shape of fabric: a publisher hands one message
//! to every live peer, best-effort, and each peer reads messages in the order
//! they were published. Both implement these traits so they can be held to the
//! same delivery contract.

use std::future::Future;

/// Sending side of a typed pub/sub channel
pub trait Publisher<M> {
    /// Hand `message` to every live peer
    ///
    /// Returns the number of peers the message was handed to. Peers that are
    /// not open, or whose transport fails, are skipped without error.
    fn publish(&self, message: M) -> usize;
}

/// Receiving side of a typed pub/sub channel
pub trait Subscriber<M> {
    /// Next message addressed to this peer, or `None` once the channel is gone
    fn next_message(&mut self) -> impl Future<Output = Option<M>> + Send;
}

/// Delivery contract shared by every transport
#[cfg(any(test, feature = "test-support"))]
pub mod contract {
    use super::{Publisher, Subscriber};
    use std::fmt::Debug;
    use std::time::Duration;

    const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

    /// One publish reaches every subscriber exactly once
    pub async fn delivers_to_every_subscriber<M, P, S>(
        publisher: &P,
        subscribers: &mut [S],
        message: M,
    ) where
        M: Clone + PartialEq + Debug,
        P: Publisher<M>,
        S: Subscriber<M>,
    {
        let delivered = publisher.publish(message.clone());
        assert_eq!(delivered, subscribers.len(), "publish should reach every subscriber");

        for subscriber in subscribers.iter_mut() {
            let received = tokio::time::timeout(RECEIVE_TIMEOUT, subscriber.next_message())
                .await
                .expect("subscriber should receive within timeout");
            assert_eq!(received, Some(message.clone()));
        }
    }

    /// Messages from one publisher arrive in publish order
    pub async fn preserves_publish_order<M, P, S>(publisher: &P, subscriber: &mut S, messages: Vec<M>)
    where
        M: Clone + PartialEq + Debug,
        P: Publisher<M>,
        S: Subscriber<M>,
    {
        for message in &messages {
            publisher.publish(message.clone());
        }
        for expected in messages {
            let received = tokio::time::timeout(RECEIVE_TIMEOUT, subscriber.next_message())
                .await
                .expect("subscriber should receive within timeout");
            assert_eq!(received, Some(expected));
        }
    }
}
