//! Fan-out of outbound messages to every connected client.
//!
//! The broadcaster owns the membership set. Telemetry produced by the ingest
//! loop reaches it through an unbounded queue drained by a single pump task,
//! so records are delivered in the order they were read from the link.

use crate::domain::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Stable identity of one client connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new() -> Self {
        Self(format!("client_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Outbound half of a client channel.
#[async_trait]
pub trait ClientSink: Send + Sync {
    fn id(&self) -> &ClientId;

    /// Queue one text message for the client. An error means the client is gone.
    async fn send(&self, message: String) -> BridgeResult<()>;
}

/// Client sink backed by an unbounded queue drained by a socket writer task.
pub struct QueuedSink {
    id: ClientId,
    tx: mpsc::UnboundedSender<String>,
}

impl QueuedSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: ClientId::new(),
                tx,
            },
            rx,
        )
    }
}

#[async_trait]
impl ClientSink for QueuedSink {
    fn id(&self) -> &ClientId {
        &self.id
    }

    async fn send(&self, message: String) -> BridgeResult<()> {
        self.tx
            .send(message)
            .map_err(|_| BridgeError::ClientClosed(self.id.clone()))
    }
}

/// Registry of subscribed clients.
#[derive(Default)]
pub struct Broadcaster {
    clients: RwLock<HashMap<ClientId, Arc<dyn ClientSink>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client. Registering the same id twice keeps a single entry.
    pub async fn register(&self, client: Arc<dyn ClientSink>) {
        let id = client.id().clone();
        let mut clients = self.clients.write().await;
        clients.insert(id.clone(), client);
        debug!("Registered client {} ({} total)", id, clients.len());
    }

    /// Remove a client. Returns whether it was registered.
    pub async fn unregister(&self, id: &ClientId) -> bool {
        let mut clients = self.clients.write().await;
        let removed = clients.remove(id).is_some();
        if removed {
            debug!("Unregistered client {} ({} remaining)", id, clients.len());
        }
        removed
    }

    /// Send `message` to every client registered when the call starts.
    ///
    /// Clients whose send fails are unregistered; the failure is not reported
    /// to the caller. Returns the number of clients that accepted the message.
    pub async fn deliver(&self, message: &str) -> usize {
        let snapshot: Vec<Arc<dyn ClientSink>> =
            self.clients.read().await.values().cloned().collect();

        let mut delivered = 0;
        let mut failed = Vec::new();

        for client in snapshot {
            match client.send(message.to_string()).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!("Dropping client {}: {}", client.id(), e);
                    failed.push(client.id().clone());
                }
            }
        }

        if !failed.is_empty() {
            let mut clients = self.clients.write().await;
            for id in &failed {
                clients.remove(id);
            }
            info!("Pruned {} unreachable clients", failed.len());
        }

        delivered
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_registered(&self, id: &ClientId) -> bool {
        self.clients.read().await.contains_key(id)
    }

    /// Drain `records` into [`Broadcaster::deliver`] until every sender is dropped.
    pub fn spawn_pump(
        self: Arc<Self>,
        mut records: mpsc::UnboundedReceiver<String>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(record) = records.recv().await {
                let delivered = self.deliver(&record).await;
                debug!("Broadcast {} bytes to {} clients", record.len(), delivered);
            }
            debug!("Broadcast pump stopped");
        })
    }
}
