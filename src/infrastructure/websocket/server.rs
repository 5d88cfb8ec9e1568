use crate::core::broadcast::{Broadcaster, ClientSink, QueuedSink};
use crate::core::dispatcher::CommandDispatcher;
use crate::domain::error::{BridgeError, BridgeResult};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// WebSocket front end of the bridge.
///
/// Each accepted connection is registered with the broadcaster for its whole
/// lifetime. Its text frames are handed to the dispatcher, and replies share
/// the client's outbound queue with broadcast telemetry.
pub struct BridgeServer {
    listener: Option<TcpListener>,
    bind_addr: SocketAddr,
    broadcaster: Arc<Broadcaster>,
    dispatcher: Arc<CommandDispatcher>,
    shutdown_sender: mpsc::Sender<()>,
    shutdown_receiver: Option<mpsc::Receiver<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl BridgeServer {
    pub async fn new(
        bind_addr: &str,
        broadcaster: Arc<Broadcaster>,
        dispatcher: Arc<CommandDispatcher>,
    ) -> BridgeResult<Self> {
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| BridgeError::Config {
            message: format!("Failed to bind to {}: {}", bind_addr, e),
        })?;

        let actual_addr = listener.local_addr()?;
        let (shutdown_sender, shutdown_receiver) = mpsc::channel(1);

        info!("WebSocket server created on {}", actual_addr);

        Ok(Self {
            listener: Some(listener),
            bind_addr: actual_addr,
            broadcaster,
            dispatcher,
            shutdown_sender,
            shutdown_receiver: Some(shutdown_receiver),
            server_handle: None,
        })
    }

    pub fn get_bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub async fn start(&mut self) -> BridgeResult<()> {
        let (Some(listener), Some(mut shutdown_receiver)) =
            (self.listener.take(), self.shutdown_receiver.take())
        else {
            return Err(BridgeError::Config {
                message: "Server is already running".to_string(),
            });
        };

        info!("Starting WebSocket server on ws://{}", self.bind_addr);

        let broadcaster = Arc::clone(&self.broadcaster);
        let dispatcher = Arc::clone(&self.dispatcher);

        let server_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, addr)) => {
                                let broadcaster = Arc::clone(&broadcaster);
                                let dispatcher = Arc::clone(&dispatcher);
                                tokio::spawn(async move {
                                    if let Err(e) = Self::handle_client(stream, addr, broadcaster, dispatcher).await {
                                        error!("Error handling client {}: {}", addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {}", e);
                            }
                        }
                    }

                    _ = shutdown_receiver.recv() => {
                        info!("Received shutdown signal, no longer accepting clients");
                        break;
                    }
                }
            }
        });

        self.server_handle = Some(server_handle);
        Ok(())
    }

    async fn handle_client(
        stream: TcpStream,
        addr: SocketAddr,
        broadcaster: Arc<Broadcaster>,
        dispatcher: Arc<CommandDispatcher>,
    ) -> BridgeResult<()> {
        let ws_stream = accept_async(stream).await?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        let (sink, mut outbound) = QueuedSink::new();
        let sink = Arc::new(sink);
        let client_id = sink.id().clone();

        info!("New WebSocket connection {} from {}", client_id, addr);
        broadcaster.register(sink.clone()).await;

        // Writer task: the only place that touches the socket's send half
        let writer_id = client_id.clone();
        let writer = tokio::spawn(async move {
            while let Some(text) = outbound.recv().await {
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    debug!("Send to {} failed: {}", writer_id, e);
                    break;
                }
            }
            if let Err(e) = ws_tx.close().await {
                debug!("Close handshake with {} not completed: {}", writer_id, e);
            }
        });

        while let Some(message) = ws_rx.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let Some(reply) = dispatcher.dispatch(&client_id, text.as_str()).await else {
                        continue;
                    };
                    match reply.to_json() {
                        Ok(json) => {
                            if sink.send(json).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => error!("Failed to encode reply for {}: {}", client_id, e),
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Read error from {}: {}", client_id, e);
                    break;
                }
            }
        }

        broadcaster.unregister(&client_id).await;
        // Dropping the last sender lets the writer drain and close the socket
        drop(sink);
        if let Err(e) = writer.await {
            warn!("Writer task for {} ended abnormally: {}", client_id, e);
        }

        info!("WebSocket connection closed: {} ({})", client_id, addr);
        Ok(())
    }

    pub async fn stop(&mut self) -> BridgeResult<()> {
        if let Some(handle) = self.server_handle.take() {
            info!("Stopping WebSocket server");

            if let Err(e) = self.shutdown_sender.send(()).await {
                warn!("Failed to send shutdown signal: {}", e);
            }

            if let Err(e) = handle.await {
                warn!("Server task completed with error: {}", e);
            }

            info!("WebSocket server stopped");
        }

        Ok(())
    }

    pub async fn get_client_count(&self) -> usize {
        self.broadcaster.client_count().await
    }

    pub fn is_running(&self) -> bool {
        self.server_handle.is_some()
    }
}

impl Drop for BridgeServer {
    fn drop(&mut self) {
        if self.server_handle.is_some() {
            warn!("BridgeServer dropped while still running - server may not shutdown gracefully");
        }
    }
}
