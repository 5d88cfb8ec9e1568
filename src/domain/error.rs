use thiserror::Error;

use crate::core::broadcast::ClientId;

/// SerialBridge unified error type
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to open link {port}: {message}")]
    LinkOpen { port: String, message: String },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Client {0} closed")]
    ClientClosed(ClientId),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
