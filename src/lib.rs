//! SerialBridge Library
//!
//! Bridges a single line-delimited serial telemetry link to any number of
//! WebSocket subscribers, and lets those subscribers list ports and open or
//! close the link.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::{Bridge, Broadcaster, ClientId, CommandDispatcher, LinkManager};
pub use crate::domain::config::BridgeConfig;
pub use crate::domain::error::{BridgeError, BridgeResult};
pub use crate::infrastructure::websocket::BridgeServer;
