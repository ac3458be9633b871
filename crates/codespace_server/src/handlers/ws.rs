use crate::sync::SyncEngine;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info};

/// Shared state for WebSocket handler
#[derive(Clone)]
pub struct WsState {
    pub engine: SyncEngine,
}

/// WebSocket upgrade handler.
///
/// The connection starts outside every room; access is checked when the client
/// sends `join-space`.
pub async fn ws_handler(State(state): State<WsState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: WsState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut connection = state.engine.registry().register();
    let conn_id = connection.id().clone();

    info!("WebSocket connected: connection={}", conn_id);

    loop {
        tokio::select! {
            // Handle incoming events from the client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        state.engine.handle_frame(&conn_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary frame from {}", conn_id);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_tx.send(Message::Pong(data)).await {
                            error!("Failed to send pong: {}", e);
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!("Client requested close");
                        break;
                    }
                    None => {
                        debug!("Client stream ended");
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }

            // Deliver events queued for this connection by the room bus
            Some(event) = connection.recv() => {
                if let Err(e) = ws_tx.send(Message::Text(event.to_json().into())).await {
                    error!("Failed to send event: {}", e);
                    break;
                }
            }

            else => break,
        }
    }

    info!(
        "WebSocket disconnected: connection={}, space={:?}",
        conn_id,
        connection.space_name()
    );

    // Dropping the connection removes it from its room
}
