//! Cross-Tab Sync fabric
//!
//! A same-origin broadcast bus shared by every open view. Each view joins as a
//! [`SyncPeer`]; a message posted by one peer is delivered to every other peer,
//! never back to the sender. The bus is independent of the Fan-Out Hub and
//! needs no server round trip.
//!
//! When no bus is available (the view runs outside a context that can create
//! one) the peer is detached and every call becomes a no-op.

mod dashboard;
mod preview;

pub use dashboard::{DashboardSync, PreviewBadge};
pub use preview::PreviewSync;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::channel::{Publisher, Subscriber};
use crate::events::{GroupId, SyncMessage};

/// Channel name every view joins
pub const GROUP_SYNC_CHANNEL: &str = "group-sync";

/// Default number of messages buffered per peer before the slowest lags
pub const DEFAULT_SYNC_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct Envelope {
    origin: u64,
    message: SyncMessage,
}

/// Same-origin broadcast bus
#[derive(Clone)]
pub struct SyncBus {
    tx: broadcast::Sender<Envelope>,
    next_peer: Arc<AtomicU64>,
}

impl SyncBus {
    /// Create a new bus buffering up to `capacity` messages per peer
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            next_peer: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Join the bus as a new peer
    pub fn join(&self) -> SyncPeer {
        let id = self.next_peer.fetch_add(1, Ordering::Relaxed);
        debug!(peer = id, "Joined {} channel", GROUP_SYNC_CHANNEL);
        SyncPeer {
            link: Some(PeerLink {
                id,
                tx: self.tx.clone(),
                rx: self.tx.subscribe(),
            }),
        }
    }

    /// Number of peers currently joined
    pub fn peer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_CAPACITY)
    }
}

struct PeerLink {
    id: u64,
    tx: broadcast::Sender<Envelope>,
    rx: broadcast::Receiver<Envelope>,
}

/// One view's membership on the sync bus
pub struct SyncPeer {
    link: Option<PeerLink>,
}

impl SyncPeer {
    /// Join `bus` if one is available, otherwise return a detached peer
    pub fn connect(bus: Option<&SyncBus>) -> Self {
        match bus {
            Some(bus) => bus.join(),
            None => {
                debug!("{} channel unavailable, sync calls are no-ops", GROUP_SYNC_CHANNEL);
                Self::detached()
            }
        }
    }

    /// Peer with no bus behind it
    pub fn detached() -> Self {
        Self { link: None }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Post a message to every other peer; returns how many received it
    pub fn post(&self, message: SyncMessage) -> usize {
        let Some(link) = &self.link else {
            return 0;
        };
        match link.tx.send(Envelope {
            origin: link.id,
            message,
        }) {
            // Our own receiver is among the counted receivers
            Ok(count) => count.saturating_sub(1),
            Err(_) => 0,
        }
    }

    /// Tell previews which group to render (`None` blanks them)
    pub fn broadcast_group_selection(&self, group: Option<GroupId>) -> usize {
        self.post(SyncMessage::group_selected(group))
    }

    /// Tell dashboards whether this preview is rendering a group
    pub fn broadcast_preview_status(&self, is_active: bool, group: Option<GroupId>) -> usize {
        self.post(SyncMessage::preview_status(is_active, group))
    }

    /// Wait for the next message posted by another peer
    ///
    /// Returns `None` for a detached peer.
    pub async fn recv(&mut self) -> Option<SyncMessage> {
        let link = self.link.as_mut()?;
        loop {
            match link.rx.recv().await {
                Ok(envelope) if envelope.origin == link.id => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(peer = link.id, skipped, "Sync peer lagged, older messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-delivered message from another peer, without waiting
    pub fn try_recv(&mut self) -> Option<SyncMessage> {
        let link = self.link.as_mut()?;
        loop {
            match link.rx.try_recv() {
                Ok(envelope) if envelope.origin == link.id => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(peer = link.id, skipped, "Sync peer lagged, older messages dropped");
                }
                Err(_) => return None,
            }
        }
    }
}

impl Publisher<SyncMessage> for SyncPeer {
    fn publish(&self, message: SyncMessage) -> usize {
        self.post(message)
    }
}

impl Subscriber<SyncMessage> for SyncPeer {
    async fn next_message(&mut self) -> Option<SyncMessage> {
        self.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gid(s: &str) -> GroupId {
        GroupId::new(s).unwrap()
    }

    #[test]
    fn test_sender_does_not_receive_own_message() {
        let bus = SyncBus::default();
        let mut dashboard = bus.join();
        let mut preview = bus.join();

        assert_eq!(dashboard.broadcast_group_selection(Some(gid("G1"))), 1);

        assert_eq!(preview.try_recv(), Some(SyncMessage::group_selected(Some(gid("G1")))));
        assert_eq!(dashboard.try_recv(), None);
    }

    #[test]
    fn test_every_other_peer_receives() {
        let bus = SyncBus::default();
        let sender = bus.join();
        let mut a = bus.join();
        let mut b = bus.join();

        assert_eq!(sender.broadcast_preview_status(false, None), 2);
        assert_eq!(a.try_recv(), Some(SyncMessage::preview_status(false, None)));
        assert_eq!(b.try_recv(), Some(SyncMessage::preview_status(false, None)));
    }

    #[test]
    fn test_dropped_peer_no_longer_counted() {
        let bus = SyncBus::default();
        let sender = bus.join();
        let other = bus.join();
        assert_eq!(bus.peer_count(), 2);

        drop(other);
        assert_eq!(sender.broadcast_group_selection(None), 0);
    }

    #[tokio::test]
    async fn test_detached_peer_is_noop() {
        let mut peer = SyncPeer::connect(None);
        assert!(!peer.is_connected());
        assert_eq!(peer.broadcast_group_selection(Some(gid("G1"))), 0);
        assert_eq!(peer.try_recv(), None);
        assert_eq!(peer.recv().await, None);
    }

    #[tokio::test]
    async fn test_sync_peers_meet_channel_contract() {
        let bus = SyncBus::default();
        let publisher = bus.join();
        let mut subscribers = vec![bus.join(), bus.join(), bus.join()];

        crate::channel::contract::delivers_to_every_subscriber(
            &publisher,
            &mut subscribers,
            SyncMessage::group_selected(Some(gid("G1"))),
        )
        .await;

        crate::channel::contract::preserves_publish_order(
            &publisher,
            &mut subscribers[0],
            vec![
                SyncMessage::group_selected(Some(gid("G1"))),
                SyncMessage::group_selected(None),
                SyncMessage::group_selected(Some(gid("G2"))),
            ],
        )
        .await;
    }
}
