//! WebSocket endpoint for the Fan-Out Hub
//!
//! GET /ws upgrades to a hub connection. Text frames in are control messages;
//! text frames out are hub events.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{ConnectionId, Hub};
use crate::AppState;

/// GET /ws
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let hub = state.hub.clone();
    let (id, outbound) = hub.connect();

    let failed_hub = hub.clone();
    ws.on_failed_upgrade(move |e| {
        warn!(connection = id, "WebSocket upgrade failed: {}", e);
        failed_hub.disconnect(id);
    })
    .on_upgrade(move |socket| serve_connection(socket, hub, id, outbound))
}

async fn serve_connection(
    socket: WebSocket,
    hub: Hub,
    id: ConnectionId,
    mut outbound: mpsc::Receiver<String>,
) {
    let (mut sink, mut stream) = socket.split();
    hub.mark_open(id);

    let writer = async {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = sink.send(Message::Text(frame)).await {
                debug!(connection = id, "Send failed: {}", e);
                break;
            }
        }
    };

    let reader = async {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => hub.handle_inbound(id, &text).await,
                Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                    Ok(text) => hub.handle_inbound(id, text).await,
                    Err(_) => warn!(connection = id, "Dropping non-UTF-8 control message"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(connection = id, "Connection error: {}", e);
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }

    hub.disconnect(id);
}
