//! In-process link used by tests and local experiments.
//!
//! Every call to [`MemoryOpener::script`] queues one future link; the returned
//! [`LineFeed`] pushes lines (or a read failure) into it once opened.

use crate::core::link::{LineSource, LinkOpener};
use crate::domain::{
    config::LinkConfig,
    error::{BridgeError, BridgeResult},
};
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Writing end of a scripted link.
#[derive(Clone)]
pub struct LineFeed {
    tx: Sender<io::Result<String>>,
}

impl LineFeed {
    /// Queue one line; a trailing newline is added.
    pub fn line(&self, line: &str) -> bool {
        self.tx.send(Ok(format!("{}\n", line))).is_ok()
    }

    /// Make the next read fail as if the device was unplugged.
    pub fn fail(&self, message: &str) -> bool {
        self.tx
            .send(Err(io::Error::new(io::ErrorKind::BrokenPipe, message.to_string())))
            .is_ok()
    }
}

/// Reading end of a scripted link. Dropping every [`LineFeed`] ends the link
/// with a read error.
pub struct MemorySource {
    rx: Receiver<io::Result<String>>,
}

impl LineSource for MemorySource {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        match self.rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(line)) => Ok(Some(line)),
            Ok(Err(e)) => Err(e),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "line feed dropped",
            )),
        }
    }
}

/// Opener handing out scripted links in the order they were queued.
#[derive(Default)]
pub struct MemoryOpener {
    queued: Mutex<VecDeque<MemorySource>>,
    opened: Mutex<Vec<LinkConfig>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a link for the next successful `open`.
    pub fn script(&self) -> LineFeed {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(MemorySource { rx });
        }
        LineFeed { tx }
    }

    /// Every config that was opened successfully, oldest first.
    pub fn opened(&self) -> Vec<LinkConfig> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl LinkOpener for MemoryOpener {
    fn open(&self, config: &LinkConfig) -> BridgeResult<Box<dyn LineSource>> {
        let source = self
            .queued
            .lock()
            .ok()
            .and_then(|mut queued| queued.pop_front())
            .ok_or_else(|| BridgeError::LinkOpen {
                port: config.port.clone(),
                message: "No such device".to_string(),
            })?;

        if let Ok(mut opened) = self.opened.lock() {
            opened.push(config.clone());
        }
        Ok(Box::new(source))
    }
}
