use crate::domain::{config::LinkConfig, error::BridgeResult, protocol::PortDescriptor};
use std::io;

/// A byte stream that yields newline-terminated records.
///
/// Implementations must bound each call by a read timeout so the ingest loop
/// can observe a stop request. `Ok(None)` means no complete line arrived in
/// time; any `Err` is treated as fatal for the link.
pub trait LineSource: Send {
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Opens the physical link described by a [`LinkConfig`].
pub trait LinkOpener: Send + Sync {
    fn open(&self, config: &LinkConfig) -> BridgeResult<Box<dyn LineSource>>;
}

/// Lists the serial endpoints currently known to the platform.
pub trait PortEnumerator: Send + Sync {
    fn list_ports(&self) -> BridgeResult<Vec<PortDescriptor>>;
}
