//! WebSocket gateway: one session per connection.
//!
//! Each accepted socket gets a fresh session id and a bounded outbound
//! channel. The channel's sender is registered with the coordinator BEFORE
//! the first frame is read, so no event can ever observe an unregistered
//! session. Two tasks then pump the connection:
//!
//! - the read loop decodes frames into [`ClientEvent`]s and submits them
//! - the push loop serializes [`ServerEvent`]s from the coordinator
//!
//! Malformed frames are logged and ignored; the protocol has no error event
//! for them. When either direction ends, the other is torn down and the
//! coordinator is told the session is gone.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use common::types::SessionId;

use crate::actors::CoordinatorHandle;
use crate::handlers::AppState;
use crate::protocol::{ClientEvent, ServerEvent};

/// Outbound channel depth per connection. When a client falls this far
/// behind, further events for it are dropped.
const OUTBOUND_CHANNEL_BUFFER: usize = 256;

/// Handler for GET /ws.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    if !state.health.is_ready() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws.on_upgrade(move |socket| handle_session(socket, state.coordinator.clone())))
}

/// Drive one session from accept to close.
async fn handle_session(socket: WebSocket, coordinator: CoordinatorHandle) {
    let session_id = SessionId::new();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_BUFFER);

    if let Err(e) = coordinator.register_session(session_id, outbound_tx).await {
        info!(
            target: "rc.gateway",
            session_id = %session_id,
            error = %e,
            "Refusing connection"
        );
        let mut socket = socket;
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: e.close_code(),
                reason: e.client_message().into(),
            })))
            .await;
        return;
    }

    info!(target: "rc.gateway", session_id = %session_id, "Session connected");

    let (sender, receiver) = socket.split();
    let mut push_task = tokio::spawn(push_events(sender, outbound_rx));
    let mut read_task = tokio::spawn(read_events(receiver, session_id, coordinator.clone()));

    // Whichever direction finishes first tears down the other.
    tokio::select! {
        _ = &mut push_task => read_task.abort(),
        _ = &mut read_task => push_task.abort(),
    }

    if let Err(e) = coordinator.session_disconnected(session_id).await {
        debug!(
            target: "rc.gateway",
            session_id = %session_id,
            error = %e,
            "Disconnect notification failed"
        );
    }
    info!(target: "rc.gateway", session_id = %session_id, "Session closed");
}

/// Serialize coordinator events onto the socket until either side closes.
async fn push_events(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerEvent>,
) {
    while let Some(event) = outbound.recv().await {
        let frame = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!(target: "rc.gateway", error = %e, "Failed to encode event, skipping");
                continue;
            }
        };
        if sender.send(Message::Text(frame)).await.is_err() {
            break;
        }
    }
}

/// Decode frames into client events and submit them to the coordinator.
async fn read_events(
    mut receiver: SplitStream<WebSocket>,
    session_id: SessionId,
    coordinator: CoordinatorHandle,
) {
    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                debug!(
                    target: "rc.gateway",
                    session_id = %session_id,
                    error = %e,
                    "WebSocket read error"
                );
                break;
            }
        };

        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    if coordinator.client_event(session_id, event).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        target: "rc.gateway",
                        session_id = %session_id,
                        error = %e,
                        "Ignoring malformed frame"
                    );
                }
            },
            Message::Close(_) => break,
            Message::Binary(_) => {
                debug!(
                    target: "rc.gateway",
                    session_id = %session_id,
                    "Ignoring binary frame"
                );
            }
            // Pings are answered by the websocket layer itself.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}
