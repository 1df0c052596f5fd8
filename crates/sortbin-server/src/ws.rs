//! The per-device WebSocket endpoint.
//!
//! Each dustbin opens one session at `/api/ws/dustbins/{dustbinId}`.
//! The session registers with the connection registry, then splits into
//! a writer task draining the connection's outbound queue and a reader
//! loop folding inbound frames into its history.

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info};

use sortbin_core::DustbinId;
use sortbin_link::inbound;

use crate::server::AppState;

pub async fn ws_handler(
    Path(dustbin_id): Path<i64>,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, DustbinId::new(dustbin_id), state))
}

async fn handle_socket(socket: WebSocket, dustbin_id: DustbinId, state: AppState) {
    let (tx, mut outbound_rx) = mpsc::channel::<String>(state.max_send_queue);
    let conn = state.registry.connect(dustbin_id, tx);
    let cancel = conn.cancelled();

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Writer: forward queued frames until the session is retired, either
    // by a superseding reconnect or by this session's own teardown.
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                frame = outbound_rx.recv() => match frame {
                    Some(text) => {
                        if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        let _ = ws_tx.close().await;
    });

    // Reader: transport errors are logged but only a close (or the stream
    // ending) removes the device from the registry.
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(WsMessage::Text(text)) => inbound::handle_frame(&conn, text.as_str()),
            Ok(WsMessage::Close(_)) => {
                info!(dustbin_id = %dustbin_id, "dustbin sent close");
                break;
            }
            // Ping/pong are handled by axum.
            Ok(_) => {}
            Err(err) => {
                error!(dustbin_id = %dustbin_id, error = %err, "dustbin transport error");
            }
        }
    }

    // Guarded removal: if this session was superseded, its replacement
    // stays registered.
    state.registry.disconnect_session(&conn);
    let _ = writer.await;
}
