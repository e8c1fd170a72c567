//! Viewer-side Fan-Out Hub client
//!
//! A viewer may ask to change the active group before its socket has finished
//! opening. [`ControlLink`] models that explicitly: while the link is
//! `Connecting` a request is parked in a single pending slot, later requests
//! overwrite it, and the slot is flushed exactly once when the link opens.
//! [`HubClient`] drives a `ControlLink` over a real WebSocket.

use futures::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::channel::Subscriber;
use crate::events::{GroupId, HubEvent};

/// Connection lifecycle as seen by a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Closed,
}

/// Deferred-send state machine for `SET_ACTIVE_GROUP`
#[derive(Debug)]
pub struct ControlLink {
    state: LinkState,
    pending: Option<HubEvent>,
}

impl ControlLink {
    pub fn new() -> Self {
        Self {
            state: LinkState::Connecting,
            pending: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Request a new active group
    ///
    /// Returns the message to send right now, if any. While connecting the
    /// request replaces whatever was pending; once closed it is dropped.
    pub fn set_active_group(&mut self, group: Option<GroupId>) -> Option<HubEvent> {
        let event = HubEvent::SetActiveGroup { group_id: group };
        match self.state {
            LinkState::Open => Some(event),
            LinkState::Connecting => {
                if self.pending.replace(event).is_some() {
                    debug!("Replacing deferred SET_ACTIVE_GROUP");
                }
                None
            }
            LinkState::Closed => {
                debug!("Hub link closed, dropping SET_ACTIVE_GROUP");
                None
            }
        }
    }

    /// Transition to `Open`; returns the deferred message to flush, if any
    pub fn on_open(&mut self) -> Option<HubEvent> {
        if self.state != LinkState::Connecting {
            return None;
        }
        self.state = LinkState::Open;
        self.pending.take()
    }

    /// Transition to `Closed`, discarding any deferred message
    pub fn on_close(&mut self) {
        self.state = LinkState::Closed;
        self.pending = None;
    }
}

impl Default for ControlLink {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket connection to the Fan-Out Hub
pub struct HubClient {
    link: Arc<Mutex<ControlLink>>,
    outbound: mpsc::UnboundedSender<String>,
    events: mpsc::UnboundedReceiver<HubEvent>,
    state: watch::Receiver<LinkState>,
}

impl HubClient {
    /// Start connecting to `url` (e.g. `ws://127.0.0.1:3001/ws`)
    ///
    /// Returns immediately in the `Connecting` state.
    pub fn connect(url: impl Into<String>) -> Self {
        let url = url.into();
        let link = Arc::new(Mutex::new(ControlLink::new()));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LinkState::Connecting);

        tokio::spawn(run_connection(
            url,
            Arc::clone(&link),
            outbound_rx,
            events_tx,
            state_tx,
        ));

        Self {
            link,
            outbound: outbound_tx,
            events: events_rx,
            state: state_rx,
        }
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Ask the hub to make `group` the active group (`None` clears it)
    pub fn set_active_group(&self, group: Option<GroupId>) {
        let mut link = self.link.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(event) = link.set_active_group(group) {
            if self.outbound.send(event.to_frame()).is_err() {
                debug!("Hub writer gone, SET_ACTIVE_GROUP not sent");
            }
        }
    }

    /// Wait until the connection leaves `Connecting`
    pub async fn wait_until_settled(&mut self) -> LinkState {
        match self.state.wait_for(|s| *s != LinkState::Connecting).await {
            Ok(state) => *state,
            Err(_) => LinkState::Closed,
        }
    }

    /// Next event broadcast by the hub
    pub async fn recv(&mut self) -> Option<HubEvent> {
        self.events.recv().await
    }
}

impl Subscriber<HubEvent> for HubClient {
    async fn next_message(&mut self) -> Option<HubEvent> {
        self.recv().await
    }
}

async fn run_connection(
    url: String,
    link: Arc<Mutex<ControlLink>>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<HubEvent>,
    state: watch::Sender<LinkState>,
) {
    let socket = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            warn!("Failed to connect to hub at {}: {}", url, e);
            link.lock().unwrap_or_else(PoisonError::into_inner).on_close();
            state.send_replace(LinkState::Closed);
            return;
        }
    };
    info!("Connected to hub at {}", url);

    let (mut sink, mut stream) = socket.split();

    // Anything requested after this point goes through `outbound`, behind the flush
    let deferred = link.lock().unwrap_or_else(PoisonError::into_inner).on_open();
    state.send_replace(LinkState::Open);
    if let Some(event) = deferred {
        if let Err(e) = sink.send(Message::Text(event.to_frame())).await {
            warn!("Failed to flush deferred SET_ACTIVE_GROUP: {}", e);
        }
    }

    let writer = async {
        while let Some(text) = outbound.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                warn!("Hub send failed: {}", e);
                break;
            }
        }
        let _ = sink.close().await;
    };

    let reader = async {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match HubEvent::from_frame(&text) {
                    Ok(event) => {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping malformed hub event: {}", e),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Hub connection error: {}", e);
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }

    link.lock().unwrap_or_else(PoisonError::into_inner).on_close();
    state.send_replace(LinkState::Closed);
    info!("Disconnected from hub at {}", url);
}
