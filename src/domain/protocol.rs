//! Wire protocol shared by the WebSocket clients and the bridge.
//!
//! Every message is one JSON object per WebSocket text frame. Client commands
//! and server replies are tagged by their `type` field; telemetry records read
//! from the link are forwarded without a wrapper unless they fail to parse.

use crate::domain::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

const KNOWN_COMMANDS: [&str; 3] = ["list_ports", "connect", "disconnect"];

/// Commands a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    ListPorts,
    Connect {
        port: String,
        /// Falls back to the configured default baud rate when absent
        #[serde(default)]
        baudrate: Option<u32>,
    },
    Disconnect,
}

impl Command {
    /// Parse one inbound text frame.
    ///
    /// Returns `Ok(None)` for well-formed JSON that does not name a known
    /// command; those are ignored by the dispatcher.
    pub fn parse(text: &str) -> BridgeResult<Option<Self>> {
        let value: Value = serde_json::from_str(text)?;

        let known = value
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|tag| KNOWN_COMMANDS.contains(&tag));
        if !known {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| BridgeError::InvalidCommand(e.to_string()))
    }
}

/// One serial endpoint as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub port: String,
    pub description: String,
}

/// Replies sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ports {
        data: Vec<PortDescriptor>,
    },
    Connected {
        port: String,
        baudrate: u32,
    },
    Disconnected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> BridgeResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Result of decoding one line read from the link.
#[derive(Debug, Clone)]
pub enum DecodedRecord {
    /// The line was valid JSON; forwarded byte for byte
    Telemetry(Box<RawValue>),
    /// Anything else, wrapped as `{"type":"raw","data":line}`
    Raw(String),
}

impl DecodedRecord {
    /// Decode a line, ignoring surrounding whitespace. Blank lines yield `None`.
    pub fn decode(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        Some(match RawValue::from_string(line.to_string()) {
            Ok(document) => Self::Telemetry(document),
            Err(_) => Self::Raw(line.to_string()),
        })
    }

    /// Serialized form broadcast to clients.
    pub fn to_wire(&self) -> BridgeResult<String> {
        let wire = match self {
            Self::Telemetry(document) => document.get().to_string(),
            Self::Raw(line) => serde_json::to_string(&RawRecord::Raw { data: line })?,
        };
        Ok(wire)
    }
}

impl PartialEq for DecodedRecord {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Telemetry(a), Self::Telemetry(b)) => a.get() == b.get(),
            (Self::Raw(a), Self::Raw(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawRecord<'a> {
    Raw { data: &'a str },
}
