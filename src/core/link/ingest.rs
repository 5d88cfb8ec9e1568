use crate::core::link::LineSource;
use crate::domain::protocol::{DecodedRecord, ServerMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Background reader for one open link.
///
/// Runs on a blocking thread. Each decoded line is pushed onto the broadcast
/// queue; the loop never touches client sockets itself.
pub(crate) struct IngestLoop {
    pub(crate) port: String,
    pub(crate) source: Box<dyn LineSource>,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) alive: Arc<AtomicBool>,
    pub(crate) records: mpsc::UnboundedSender<String>,
    pub(crate) idle_backoff: Duration,
    pub(crate) notify_link_drop: bool,
}

impl IngestLoop {
    pub(crate) fn run(mut self) {
        info!("Ingest loop started for {}", self.port);

        while !self.stop.load(Ordering::Acquire) {
            match self.source.read_line() {
                Ok(Some(line)) => {
                    // A line that raced a close request belongs to the old link
                    if self.stop.load(Ordering::Acquire) {
                        break;
                    }
                    let Some(record) = DecodedRecord::decode(&line) else {
                        continue;
                    };
                    let wire = match record.to_wire() {
                        Ok(wire) => wire,
                        Err(e) => {
                            warn!("Dropping undecodable record from {}: {}", self.port, e);
                            continue;
                        }
                    };
                    if self.records.send(wire).is_err() {
                        warn!("Broadcast queue closed, stopping ingest for {}", self.port);
                        break;
                    }
                }
                Ok(None) => std::thread::sleep(self.idle_backoff),
                Err(e) => {
                    error!("Serial read error on {}: {}", self.port, e);
                    self.alive.store(false, Ordering::Release);
                    if self.notify_link_drop {
                        self.announce_drop();
                    }
                    break;
                }
            }
        }

        self.alive.store(false, Ordering::Release);
        info!("Ingest loop stopped for {}", self.port);
    }

    fn announce_drop(&self) {
        let notice = ServerMessage::Disconnected {
            reason: Some("error".to_string()),
        };
        match notice.to_json() {
            Ok(json) => {
                if self.records.send(json).is_err() {
                    debug!("Broadcast queue closed before link drop notice");
                }
            }
            Err(e) => error!("Failed to encode link drop notice: {}", e),
        }
    }
}
