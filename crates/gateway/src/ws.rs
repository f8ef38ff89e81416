use std::{net::SocketAddr, sync::Arc, time::Instant};

use {
    axum::extract::ws::{Message, WebSocket},
    futures::{SinkExt, stream::StreamExt},
    tokio::sync::mpsc,
    tracing::{debug, info},
};

use patchbay_protocol::parse_message;

use crate::{
    dispatch::MessageRouter,
    state::{ConnectedClient, GatewayState},
};

/// Handle a single WebSocket connection through its full lifecycle:
/// registration → message loop → cleanup.
pub async fn handle_connection(
    socket: WebSocket,
    state: Arc<GatewayState>,
    router: Arc<dyn MessageRouter>,
    remote_addr: SocketAddr,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, remote_ip = %remote_addr.ip(), "ws: new connection");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (client_tx, mut client_rx) = mpsc::unbounded_channel::<String>();

    // Write loop: forwards queued lines to the socket.
    let write_conn_id = conn_id.clone();
    let write_handle = tokio::spawn(async move {
        while let Some(line) = client_rx.recv().await {
            if ws_tx.send(Message::Text(line.into())).await.is_err() {
                debug!(conn_id = %write_conn_id, "ws: write loop closed");
                break;
            }
        }
    });

    state
        .register_client(ConnectedClient {
            conn_id: conn_id.clone(),
            sender: client_tx.clone(),
            connected_at: Instant::now(),
        })
        .await;

    // ── Message loop ─────────────────────────────────────────────────────
    // One frame at a time: a connection's requests dispatch in arrival
    // order, though their runs may finish in any order.

    while let Some(msg) = ws_rx.next().await {
        let text = match msg {
            Ok(Message::Text(t)) => t.to_string(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "ws: read error");
                break;
            },
        };

        let Some(request) = parse_message(&text) else {
            let preview: String = text.chars().take(80).collect();
            debug!(conn_id = %conn_id, frame = %preview, "ws: frame failed the route grammar; dropped");
            continue;
        };
        router.dispatch(request, &conn_id, &state).await;
    }

    // ── Cleanup ──────────────────────────────────────────────────────────

    let duration = state
        .remove_client(&conn_id)
        .await
        .map(|c| c.connected_at.elapsed())
        .unwrap_or_default();
    info!(
        conn_id = %conn_id,
        duration_secs = duration.as_secs(),
        "ws: connection closed"
    );

    drop(client_tx);
    write_handle.abort();
}
