use crate::core::broadcast::Broadcaster;
use crate::core::dispatcher::CommandDispatcher;
use crate::core::link::{IngestSettings, LinkManager, LinkOpener, PortEnumerator};
use crate::domain::config::BridgeConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// The wired-up bridging engine: link manager, broadcaster and dispatcher
/// sharing one broadcast queue.
///
/// Must be created inside a Tokio runtime; it spawns the broadcast pump.
pub struct Bridge {
    broadcaster: Arc<Broadcaster>,
    link: Arc<LinkManager>,
    dispatcher: Arc<CommandDispatcher>,
    pump: JoinHandle<()>,
}

impl Bridge {
    pub fn new(
        config: &BridgeConfig,
        opener: Arc<dyn LinkOpener>,
        enumerator: Arc<dyn PortEnumerator>,
    ) -> Self {
        let (records_tx, records_rx) = mpsc::unbounded_channel();

        let broadcaster = Arc::new(Broadcaster::new());
        let pump = Arc::clone(&broadcaster).spawn_pump(records_rx);

        let settings = IngestSettings {
            idle_backoff: config.serial.idle_backoff(),
            notify_link_drop: config.global.notify_link_drop,
        };
        let link = Arc::new(LinkManager::new(opener, records_tx, settings));
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::clone(&link),
            enumerator,
            config.serial.clone(),
        ));

        Self {
            broadcaster,
            link,
            dispatcher,
            pump,
        }
    }

    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        Arc::clone(&self.broadcaster)
    }

    pub fn link(&self) -> Arc<LinkManager> {
        Arc::clone(&self.link)
    }

    pub fn dispatcher(&self) -> Arc<CommandDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Close the link and stop the broadcast pump.
    pub async fn shutdown(self) {
        if self.link.close().await {
            info!("Serial link closed on shutdown");
        }
        // Queued records are abandoned along with the link
        self.pump.abort();
        if let Err(e) = self.pump.await {
            if !e.is_cancelled() {
                warn!("Broadcast pump ended abnormally: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::broadcast::{ClientId, ClientSink, QueuedSink};
    use crate::core::link::MemoryOpener;
    use crate::domain::error::BridgeResult;
    use crate::domain::protocol::{PortDescriptor, ServerMessage};
    use std::time::Duration;
    use tokio::time::timeout;

    struct NoPorts;

    impl PortEnumerator for NoPorts {
        fn list_ports(&self) -> BridgeResult<Vec<PortDescriptor>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_connected_link_feeds_every_client() {
        let opener = Arc::new(MemoryOpener::new());
        let feed = opener.script();
        let bridge = Bridge::new(&BridgeConfig::default(), opener, Arc::new(NoPorts));

        let (first, mut first_rx) = QueuedSink::new();
        let (second, mut second_rx) = QueuedSink::new();
        bridge.broadcaster().register(Arc::new(first)).await;
        bridge.broadcaster().register(Arc::new(second)).await;

        let reply = bridge
            .dispatcher()
            .dispatch(&ClientId::new(), r#"{"type":"connect","port":"COM3"}"#)
            .await;
        assert!(matches!(reply, Some(ServerMessage::Connected { .. })));

        feed.line(r#"{"x":1}"#);
        let wait = Duration::from_secs(2);
        assert_eq!(timeout(wait, first_rx.recv()).await.unwrap().unwrap(), r#"{"x":1}"#);
        assert_eq!(timeout(wait, second_rx.recv()).await.unwrap().unwrap(), r#"{"x":1}"#);

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_link() {
        let opener = Arc::new(MemoryOpener::new());
        let feed = opener.script();
        let bridge = Bridge::new(&BridgeConfig::default(), opener, Arc::new(NoPorts));
        let link = bridge.link();

        bridge
            .dispatcher()
            .dispatch(&ClientId::new(), r#"{"type":"connect","port":"COM3"}"#)
            .await;
        assert!(link.is_open().await);

        bridge.shutdown().await;
        assert!(!link.is_open().await);
        assert!(!feed.line("after shutdown"));
    }

    #[tokio::test]
    async fn test_sink_identity_survives_registration() {
        let bridge = Bridge::new(
            &BridgeConfig::default(),
            Arc::new(MemoryOpener::new()),
            Arc::new(NoPorts),
        );
        let (sink, _rx) = QueuedSink::new();
        let id = sink.id().clone();
        bridge.broadcaster().register(Arc::new(sink)).await;
        assert!(bridge.broadcaster().is_registered(&id).await);
        bridge.shutdown().await;
    }
}
