use serialbridge::core::ClientId;
use serialbridge::domain::protocol::{Command, ServerMessage};
use serialbridge::{BridgeError, BridgeResult};
use std::error::Error;

/// Error handling and resilience tests
#[cfg(test)]
mod error_handling_tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let cases = vec![
            (
                BridgeError::Config {
                    message: "bad port".to_string(),
                },
                "Configuration error: bad port",
            ),
            (
                BridgeError::LinkOpen {
                    port: "COM9".to_string(),
                    message: "No such device".to_string(),
                },
                "Failed to open link COM9: No such device",
            ),
            (
                BridgeError::InvalidCommand("missing field `port`".to_string()),
                "Invalid command: missing field `port`",
            ),
            (
                BridgeError::ClientClosed(ClientId::from("client_1")),
                "Client client_1 closed",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<BridgeError>();
    }

    #[test]
    fn test_io_error_conversion_keeps_source() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: BridgeError = io_error.into();
        assert!(matches!(error, BridgeError::Io(_)));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: BridgeError = json_error.into();
        assert!(matches!(error, BridgeError::Json(_)));
        assert!(error.to_string().starts_with("JSON error:"));
    }

    #[test]
    fn test_serial_error_conversion() {
        let serial_error =
            serialport::Error::new(serialport::ErrorKind::NoDevice, "device unplugged");
        let error: BridgeError = serial_error.into();
        assert!(matches!(error, BridgeError::Serial(_)));
        assert!(error.to_string().contains("device unplugged"));
    }

    #[test]
    fn test_result_propagation() {
        fn parse_then_fail(text: &str) -> BridgeResult<Command> {
            let command = Command::parse(text)?;
            command.ok_or_else(|| BridgeError::InvalidCommand("unsupported".to_string()))
        }

        assert!(matches!(
            parse_then_fail("{"),
            Err(BridgeError::Json(_))
        ));
        assert!(matches!(
            parse_then_fail(r#"{"type":"connect"}"#),
            Err(BridgeError::InvalidCommand(_))
        ));
        assert!(matches!(
            parse_then_fail(r#"{"type":"blink"}"#),
            Err(BridgeError::InvalidCommand(ref detail)) if detail == "unsupported"
        ));
        assert!(matches!(
            parse_then_fail(r#"{"type":"list_ports"}"#),
            Ok(Command::ListPorts)
        ));
    }

    #[test]
    fn test_errors_render_as_wire_messages() {
        let error = BridgeError::InvalidCommand("baudrate must be a number".to_string());
        let json = ServerMessage::error(error.to_string()).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"type":"error","message":"Invalid command: baudrate must be a number"}"#
        );
    }
}
