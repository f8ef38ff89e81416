use std::{collections::HashMap, sync::Arc, time::Instant};

use {
    tokio::sync::{RwLock, broadcast, mpsc},
    tracing::warn,
};

use crate::{present::PresentJob, signal::DispatchSignal};

// ── Connected client ─────────────────────────────────────────────────────────

/// A client currently connected to the gateway.
#[derive(Debug)]
pub struct ConnectedClient {
    pub conn_id: String,
    /// Channel feeding this client's write loop.
    pub sender: mpsc::UnboundedSender<String>,
    pub connected_at: Instant,
}

impl ConnectedClient {
    /// Queue an outbound line. Returns false when the write loop is gone.
    pub fn send(&self, line: &str) -> bool {
        self.sender.send(line.to_string()).is_ok()
    }
}

// ── Gateway state ────────────────────────────────────────────────────────────

/// Shared gateway runtime state, wrapped in Arc for use across async tasks.
pub struct GatewayState {
    /// All connected clients, keyed by conn_id.
    pub clients: RwLock<HashMap<String, ConnectedClient>>,
    /// Server version string.
    pub version: String,
    /// Lifecycle signal fan-out (ready, matched, unknown).
    signals: broadcast::Sender<DispatchSignal>,
    /// Queue of terminal runs awaiting presentation.
    completions: mpsc::UnboundedSender<PresentJob>,
}

impl GatewayState {
    /// Create the shared state together with the receiving end of the
    /// completion queue, which the presenter loop drains.
    #[must_use]
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PresentJob>) {
        let (signals, _) = broadcast::channel(64);
        let (completions, completion_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Self {
            clients: RwLock::new(HashMap::new()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            signals,
            completions,
        });
        (state, completion_rx)
    }

    /// Register a new client connection.
    pub async fn register_client(&self, client: ConnectedClient) {
        let conn_id = client.conn_id.clone();
        self.clients.write().await.insert(conn_id, client);
    }

    /// Remove a client by conn_id. Returns the removed client if found.
    pub async fn remove_client(&self, conn_id: &str) -> Option<ConnectedClient> {
        self.clients.write().await.remove(conn_id)
    }

    /// Number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Queue a line for one client. False when the client is unknown or its
    /// write loop is gone.
    pub async fn send_to(&self, conn_id: &str, line: &str) -> bool {
        let clients = self.clients.read().await;
        clients.get(conn_id).is_some_and(|c| c.send(line))
    }

    /// Snapshot of every client's sender. The registry lock is released
    /// before the caller sends anything, so a disconnect during delivery
    /// cannot disturb the membership being walked.
    pub async fn sender_snapshot(&self) -> Vec<mpsc::UnboundedSender<String>> {
        self.clients
            .read()
            .await
            .values()
            .map(|c| c.sender.clone())
            .collect()
    }

    /// Emit a lifecycle signal. Dropped when nobody subscribes.
    pub fn emit(&self, signal: DispatchSignal) {
        let _ = self.signals.send(signal);
    }

    /// Subscribe to lifecycle signals.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchSignal> {
        self.signals.subscribe()
    }

    /// Hand a terminal run to the presenter loop.
    pub fn enqueue_presentation(&self, job: PresentJob) {
        if self.completions.send(job).is_err() {
            warn!("presenter loop is gone; run outcome dropped");
        }
    }
}
