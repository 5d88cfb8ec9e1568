use crate::core::link::ingest::IngestLoop;
use crate::core::link::LinkOpener;
use crate::domain::{
    config::LinkConfig,
    error::{BridgeError, BridgeResult},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Ingest loop tuning shared by every link the manager opens.
#[derive(Debug, Clone, Copy)]
pub struct IngestSettings {
    pub idle_backoff: Duration,
    pub notify_link_drop: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            idle_backoff: Duration::from_millis(10),
            notify_link_drop: true,
        }
    }
}

struct ActiveLink {
    config: LinkConfig,
    stop: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ActiveLink {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Ask the ingest loop to stop and wait for it to release the port.
    async fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Err(e) = (&mut self.task).await {
            warn!("Ingest loop for {} ended abnormally: {}", self.config.port, e);
        }
    }
}

impl Drop for ActiveLink {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Owner of the single serial link.
///
/// The serial handle itself lives inside the ingest loop; the manager keeps
/// its stop flag and join handle. `open` and `close` are serialized by one
/// mutex and always wait for the previous loop to exit, so at most one loop
/// ever reads from a port.
pub struct LinkManager {
    opener: Arc<dyn LinkOpener>,
    records: mpsc::UnboundedSender<String>,
    settings: IngestSettings,
    active: Mutex<Option<ActiveLink>>,
}

impl LinkManager {
    pub fn new(
        opener: Arc<dyn LinkOpener>,
        records: mpsc::UnboundedSender<String>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            opener,
            records,
            settings,
            active: Mutex::new(None),
        }
    }

    /// Open `config`, closing any link that is already open.
    ///
    /// On failure the manager is left closed.
    pub async fn open(&self, config: LinkConfig) -> BridgeResult<()> {
        let mut active = self.active.lock().await;

        if let Some(mut previous) = active.take() {
            info!("Closing {} before opening {}", previous.config.port, config.port);
            previous.shutdown().await;
        }

        // serialport opens block on the device, keep them off the runtime workers
        let opener = Arc::clone(&self.opener);
        let request = config.clone();
        let source = tokio::task::spawn_blocking(move || opener.open(&request))
            .await
            .map_err(|e| BridgeError::LinkOpen {
                port: config.port.clone(),
                message: format!("open task failed: {}", e),
            })??;

        let stop = Arc::new(AtomicBool::new(false));
        let alive = Arc::new(AtomicBool::new(true));
        let ingest = IngestLoop {
            port: config.port.clone(),
            source,
            stop: Arc::clone(&stop),
            alive: Arc::clone(&alive),
            records: self.records.clone(),
            idle_backoff: self.settings.idle_backoff,
            notify_link_drop: self.settings.notify_link_drop,
        };
        let task = tokio::task::spawn_blocking(move || ingest.run());

        info!("Connected to {} at {} baud", config.port, config.baud_rate);
        *active = Some(ActiveLink {
            config,
            stop,
            alive,
            task,
        });

        Ok(())
    }

    /// Close the link. Returns `false` when nothing was open.
    pub async fn close(&self) -> bool {
        let mut active = self.active.lock().await;
        match active.take() {
            Some(mut link) => {
                let was_alive = link.is_alive();
                link.shutdown().await;
                info!("Serial connection to {} closed", link.config.port);
                was_alive
            }
            None => false,
        }
    }

    pub async fn is_open(&self) -> bool {
        self.current().await.is_some()
    }

    /// Config of the open link, if any.
    ///
    /// A link whose ingest loop died on a read error is reaped here and
    /// reported as closed.
    pub async fn current(&self) -> Option<LinkConfig> {
        let mut active = self.active.lock().await;

        if active.as_ref().is_some_and(|link| !link.is_alive()) {
            if let Some(mut dead) = active.take() {
                dead.shutdown().await;
                info!("Link {} marked closed after read failure", dead.config.port);
            }
        }

        active.as_ref().map(|link| link.config.clone())
    }
}
