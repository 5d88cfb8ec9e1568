// WebSocket module - Client-facing server
pub mod server;

pub use server::BridgeServer;
