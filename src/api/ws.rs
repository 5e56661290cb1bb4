// =============================================================================
// WebSocket Handler: Push-based label updates
// =============================================================================
//
// Clients connect to `/api/ws` and receive:
//   1. The current label text immediately on connect.
//   2. The new label text every time a label writer replaces it.
//
// Frames are plain text, exactly what the label shows. Writers that update
// faster than a client reads are coalesced: the client only ever sees the
// latest value.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::app_state::AppState;

/// Axum handler for the WebSocket upgrade request.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("WebSocket connection accepted, upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Manages a single WebSocket connection lifecycle.
///
/// Runs three branches via `tokio::select!`:
///   1. **Shutdown**: the server is stopping.
///   2. **Push**: the label changed; send the new text.
///   3. **Recv**: Ping/Pong and Close from the client.
async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut label_rx = state.subscribe_label();

    let initial = label_rx.borrow_and_update().clone();
    if let Err(e) = sender.send(Message::Text(initial)).await {
        warn!(error = %e, "Failed to send initial label");
        return;
    }

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }

            // ── Push: label replaced by a writer ────────────────────────
            changed = label_rx.changed() => {
                if changed.is_err() {
                    debug!("label channel closed");
                    break;
                }
                let text = label_rx.borrow_and_update().clone();
                if let Err(e) = sender.send(Message::Text(text)).await {
                    debug!(error = %e, "WebSocket send failed, disconnecting");
                    break;
                }
            }

            // ── Recv: process incoming messages ─────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "Failed to send Pong, disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket Close frame received, disconnecting");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error, disconnecting");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    info!("WebSocket connection closed");
}
