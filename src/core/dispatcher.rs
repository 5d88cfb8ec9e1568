use crate::core::broadcast::ClientId;
use crate::core::link::{LinkManager, PortEnumerator};
use crate::domain::{
    config::{LinkConfig, SerialConfig},
    error::BridgeError,
    protocol::{Command, ServerMessage},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Turns inbound client messages into link operations and replies.
///
/// Holds no state of its own beyond its collaborators; every reply goes back
/// only to the client that sent the command.
pub struct CommandDispatcher {
    link: Arc<LinkManager>,
    enumerator: Arc<dyn PortEnumerator>,
    serial: SerialConfig,
}

impl CommandDispatcher {
    pub fn new(
        link: Arc<LinkManager>,
        enumerator: Arc<dyn PortEnumerator>,
        serial: SerialConfig,
    ) -> Self {
        Self {
            link,
            enumerator,
            serial,
        }
    }

    /// Handle one text frame from `client`. `None` means no reply is sent.
    pub async fn dispatch(&self, client: &ClientId, text: &str) -> Option<ServerMessage> {
        match Command::parse(text) {
            Ok(Some(command)) => {
                debug!("Client {} sent {:?}", client, command);
                Some(self.execute(command).await)
            }
            Ok(None) => {
                debug!("Ignoring unrecognized command from {}", client);
                None
            }
            Err(BridgeError::Json(e)) => {
                debug!("Invalid JSON from {}: {}", client, e);
                Some(ServerMessage::error("Invalid JSON"))
            }
            Err(e) => {
                debug!("Rejected command from {}: {}", client, e);
                Some(ServerMessage::error(e.to_string()))
            }
        }
    }

    async fn execute(&self, command: Command) -> ServerMessage {
        match command {
            Command::ListPorts => match self.enumerator.list_ports() {
                Ok(data) => ServerMessage::Ports { data },
                Err(e) => {
                    error!("Failed to list serial ports: {}", e);
                    ServerMessage::error("Failed to list serial ports")
                }
            },
            Command::Connect { port, baudrate } => {
                let baudrate = baudrate.unwrap_or(self.serial.default_baud_rate);
                let config = LinkConfig::new(port.clone(), baudrate, &self.serial);

                match self.link.open(config).await {
                    Ok(()) => ServerMessage::Connected { port, baudrate },
                    Err(e) => {
                        warn!("Failed to connect to {}: {}", port, e);
                        ServerMessage::error(format!("Failed to connect to {}", port))
                    }
                }
            }
            Command::Disconnect => {
                if self.link.close().await {
                    info!("Serial link closed by client request");
                }
                ServerMessage::Disconnected { reason: None }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::link::{IngestSettings, MemoryOpener};
    use crate::domain::{error::BridgeResult, protocol::PortDescriptor};
    use tokio::sync::mpsc;

    struct FixedPorts(Vec<PortDescriptor>);

    impl PortEnumerator for FixedPorts {
        fn list_ports(&self) -> BridgeResult<Vec<PortDescriptor>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenRegistry;

    impl PortEnumerator for BrokenRegistry {
        fn list_ports(&self) -> BridgeResult<Vec<PortDescriptor>> {
            Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "registry unavailable",
            )))
        }
    }

    fn ports() -> Vec<PortDescriptor> {
        vec![
            PortDescriptor {
                port: "/dev/ttyUSB0".to_string(),
                description: "CP2102 USB to UART".to_string(),
            },
            PortDescriptor {
                port: "/dev/ttyS0".to_string(),
                description: "n/a".to_string(),
            },
        ]
    }

    fn dispatcher(
        opener: Arc<MemoryOpener>,
        enumerator: Arc<dyn PortEnumerator>,
    ) -> (CommandDispatcher, Arc<LinkManager>) {
        let (tx, _rx) = mpsc::unbounded_channel();
        let link = Arc::new(LinkManager::new(opener, tx, IngestSettings::default()));
        (
            CommandDispatcher::new(Arc::clone(&link), enumerator, SerialConfig::default()),
            link,
        )
    }

    #[tokio::test]
    async fn test_list_ports_reports_snapshot() {
        let (dispatcher, link) =
            dispatcher(Arc::new(MemoryOpener::new()), Arc::new(FixedPorts(ports())));

        let reply = dispatcher
            .dispatch(&ClientId::new(), r#"{"type":"list_ports"}"#)
            .await;
        assert_eq!(reply, Some(ServerMessage::Ports { data: ports() }));
        assert!(!link.is_open().await);
    }

    #[tokio::test]
    async fn test_list_ports_failure_is_reported() {
        let (dispatcher, _link) =
            dispatcher(Arc::new(MemoryOpener::new()), Arc::new(BrokenRegistry));

        let reply = dispatcher
            .dispatch(&ClientId::new(), r#"{"type":"list_ports"}"#)
            .await;
        assert_eq!(reply, Some(ServerMessage::error("Failed to list serial ports")));
    }

    #[tokio::test]
    async fn test_connect_to_missing_device() {
        let (dispatcher, link) =
            dispatcher(Arc::new(MemoryOpener::new()), Arc::new(FixedPorts(Vec::new())));

        let reply = dispatcher
            .dispatch(
                &ClientId::new(),
                r#"{"type":"connect","port":"COM9","baudrate":9600}"#,
            )
            .await;
        assert_eq!(reply, Some(ServerMessage::error("Failed to connect to COM9")));
        assert!(!link.is_open().await);
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let opener = Arc::new(MemoryOpener::new());
        let _feed = opener.script();
        let (dispatcher, link) =
            dispatcher(Arc::clone(&opener), Arc::new(FixedPorts(Vec::new())));
        let client = ClientId::new();

        let reply = dispatcher
            .dispatch(&client, r#"{"type":"connect","port":"/dev/ttyACM0"}"#)
            .await;
        assert_eq!(
            reply,
            Some(ServerMessage::Connected {
                port: "/dev/ttyACM0".to_string(),
                baudrate: 115_200,
            })
        );
        assert!(link.is_open().await);
        assert_eq!(opener.opened()[0].baud_rate, 115_200);

        let reply = dispatcher.dispatch(&client, r#"{"type":"disconnect"}"#).await;
        assert_eq!(reply, Some(ServerMessage::Disconnected { reason: None }));
        assert!(!link.is_open().await);

        // Disconnecting again is still acknowledged
        let reply = dispatcher.dispatch(&client, r#"{"type":"disconnect"}"#).await;
        assert_eq!(reply, Some(ServerMessage::Disconnected { reason: None }));
    }

    #[tokio::test]
    async fn test_invalid_json_reply() {
        let (dispatcher, _link) =
            dispatcher(Arc::new(MemoryOpener::new()), Arc::new(FixedPorts(Vec::new())));

        let reply = dispatcher.dispatch(&ClientId::new(), "not valid json").await;
        assert_eq!(reply, Some(ServerMessage::error("Invalid JSON")));
    }

    #[tokio::test]
    async fn test_connect_without_port_is_rejected() {
        let (dispatcher, _link) =
            dispatcher(Arc::new(MemoryOpener::new()), Arc::new(FixedPorts(Vec::new())));

        let reply = dispatcher
            .dispatch(&ClientId::new(), r#"{"type":"connect"}"#)
            .await;
        match reply {
            Some(ServerMessage::Error { message }) => {
                assert!(message.starts_with("Invalid command"), "{}", message)
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unrecognized_command_is_ignored() {
        let (dispatcher, link) =
            dispatcher(Arc::new(MemoryOpener::new()), Arc::new(FixedPorts(ports())));

        assert_eq!(
            dispatcher
                .dispatch(&ClientId::new(), r#"{"type":"reboot"}"#)
                .await,
            None
        );
        assert!(!link.is_open().await);
    }
}
