// Link module - Serial link lifecycle and the ingest loop
mod ingest;
pub mod manager;
pub mod memory;
pub mod transport;

pub use manager::{IngestSettings, LinkManager};
pub use memory::{LineFeed, MemoryOpener};
pub use transport::{LineSource, LinkOpener, PortEnumerator};
