//! Event Fan-Out Hub
//!
//! Many-client publish/subscribe over WebSocket. Inbound control messages set
//! the Active-Group Register; outbound `FILE_MOVED` events go to every open
//! connection.
//!
//! The connection set prunes on write: a broadcast attempts delivery to each
//! open connection and removes any whose outbound queue has closed. Nothing is
//! retried or queued for connections that are not open.

mod ws;

pub use ws::ws_upgrade;

use booth_common::channel::Publisher;
use booth_common::HubEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::register::RegisterHandle;

/// Default per-connection outbound queue depth
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Identifier of one hub connection
pub type ConnectionId = u64;

/// Per-connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

struct Connection {
    state: ConnectionState,
    outbound: mpsc::Sender<String>,
}

struct HubInner {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
    outbound_capacity: usize,
    register: RegisterHandle,
}

/// Fan-out hub shared by the WebSocket endpoint and the ingestion watcher
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    pub fn new(register: RegisterHandle, outbound_capacity: usize) -> Self {
        info!("Fan-out hub initialized with outbound capacity {}", outbound_capacity);
        Self {
            inner: Arc::new(HubInner {
                connections: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                outbound_capacity: outbound_capacity.max(1),
                register,
            }),
        }
    }

    pub fn register(&self) -> &RegisterHandle {
        &self.inner.register
    }

    /// Add a connection in the `Connecting` state
    ///
    /// Returns its id and the queue its writer drains once open.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.outbound_capacity);
        self.connections().insert(
            id,
            Connection {
                state: ConnectionState::Connecting,
                outbound: tx,
            },
        );
        debug!(connection = id, "Client connecting");
        (id, rx)
    }

    /// Mark a connection `Open`; only open connections receive broadcasts
    pub fn mark_open(&self, id: ConnectionId) {
        if let Some(connection) = self.connections().get_mut(&id) {
            connection.state = ConnectionState::Open;
            info!(connection = id, "Client connected");
        }
    }

    /// Remove a connection after the transport closed or errored
    pub fn disconnect(&self, id: ConnectionId) {
        if self.connections().remove(&id).is_some() {
            info!(connection = id, "Client disconnected");
        }
    }

    /// Current state of a connection; removed connections report `Closed`
    pub fn connection_state(&self, id: ConnectionId) -> ConnectionState {
        self.connections()
            .get(&id)
            .map(|c| c.state)
            .unwrap_or(ConnectionState::Closed)
    }

    /// Number of connections currently `Open`
    pub fn open_count(&self) -> usize {
        self.connections()
            .values()
            .filter(|c| c.state == ConnectionState::Open)
            .count()
    }

    /// Deliver `event` to every open connection
    ///
    /// Returns how many connections accepted it. Connections whose queue has
    /// closed are pruned; a full queue skips that connection for this event.
    pub fn broadcast(&self, event: &HubEvent) -> usize {
        let frame = event.to_frame();
        let mut connections = self.connections();
        let mut delivered = 0;

        connections.retain(|id, connection| {
            if connection.state != ConnectionState::Open {
                return true;
            }
            match connection.outbound.try_send(frame.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(connection = *id, "Outbound queue full, skipping {}", event.event_type());
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    connection.state = ConnectionState::Closed;
                    debug!(connection = *id, "Pruning closed connection");
                    false
                }
            }
        });

        debug!("Broadcast {} to {} clients", event.event_type(), delivered);
        delivered
    }

    /// Handle one inbound text frame from `id`
    ///
    /// Malformed frames are logged and dropped; the connection stays open.
    pub async fn handle_inbound(&self, id: ConnectionId, text: &str) {
        match HubEvent::from_frame(text) {
            Ok(HubEvent::SetActiveGroup { group_id }) => {
                if let Err(e) = self.inner.register.set(group_id).await {
                    warn!(connection = id, "Failed to apply SET_ACTIVE_GROUP: {}", e);
                }
            }
            Ok(other) => {
                debug!(connection = id, "Ignoring client-sent {}", other.event_type());
            }
            Err(e) => {
                warn!(connection = id, "Dropping malformed control message: {}", e);
            }
        }
    }

    fn connections(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        self.inner
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Publisher<HubEvent> for Hub {
    fn publish(&self, message: HubEvent) -> usize {
        self.broadcast(&message)
    }
}
