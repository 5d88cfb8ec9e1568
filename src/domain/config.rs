use serde::{Deserialize, Serialize};
use std::time::Duration;

/// SerialBridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// WebSocket server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Serial link defaults
    #[serde(default)]
    pub serial: SerialConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Broadcast a `disconnected` notice when the link drops on a read error
    #[serde(default = "default_notify_link_drop")]
    pub notify_link_drop: bool,
}

/// WebSocket server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Serial framing and polling settings applied to every opened link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Baud rate used when a `connect` command omits `baudrate`
    #[serde(default = "default_baud_rate")]
    pub default_baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: ParityConfig,
    #[serde(default = "default_flow_control")]
    pub flow_control: FlowControlConfig,
    /// Upper bound on a single blocking read
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    /// Pause between polls when no data is available
    #[serde(default = "default_idle_backoff")]
    pub idle_backoff_ms: u64,
    /// Longest line kept while waiting for a newline; longer input is cut
    /// and forwarded as a raw record
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

/// Parity configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    #[default]
    None,
    Odd,
    Even,
}

/// Flow control configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlConfig {
    #[default]
    None,
    Hardware,
    Software,
}

/// Parameters for one link open request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: ParityConfig,
    pub flow_control: FlowControlConfig,
    pub read_timeout: Duration,
    pub max_line_bytes: usize,
}

impl LinkConfig {
    /// Build a link request for `port` using the framing from `serial`.
    pub fn new(port: impl Into<String>, baud_rate: u32, serial: &SerialConfig) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            data_bits: serial.data_bits,
            stop_bits: serial.stop_bits,
            parity: serial.parity,
            flow_control: serial.flow_control,
            read_timeout: serial.read_timeout(),
            max_line_bytes: serial.max_line_bytes,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding a listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_notify_link_drop() -> bool {
    true
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_parity() -> ParityConfig {
    ParityConfig::None
}

fn default_flow_control() -> FlowControlConfig {
    FlowControlConfig::None
}

fn default_read_timeout() -> u64 {
    100
}

fn default_idle_backoff() -> u64 {
    10
}

fn default_max_line_bytes() -> usize {
    64 * 1024
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            notify_link_drop: default_notify_link_drop(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: default_parity(),
            flow_control: default_flow_control(),
            read_timeout_ms: default_read_timeout(),
            idle_backoff_ms: default_idle_backoff(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = BridgeConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: BridgeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.server.port, 8765);
        assert_eq!(deserialized.serial.default_baud_rate, 115_200);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [serial]
            parity = "even"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.serial.parity, ParityConfig::Even);
        assert_eq!(config.serial.read_timeout_ms, 100);
        assert_eq!(config.serial.max_line_bytes, 65_536);
        assert!(config.global.notify_link_drop);
    }

    #[test]
    fn test_link_config_takes_serial_framing() {
        let serial = SerialConfig {
            data_bits: 7,
            flow_control: FlowControlConfig::Hardware,
            read_timeout_ms: 250,
            ..SerialConfig::default()
        };

        let link = LinkConfig::new("/dev/ttyUSB0", 9600, &serial);
        assert_eq!(link.port, "/dev/ttyUSB0");
        assert_eq!(link.baud_rate, 9600);
        assert_eq!(link.data_bits, 7);
        assert_eq!(link.flow_control, FlowControlConfig::Hardware);
        assert_eq!(link.read_timeout, Duration::from_millis(250));
        assert_eq!(link.max_line_bytes, 65_536);
    }

    #[test]
    fn test_bind_addr() {
        assert_eq!(ServerConfig::default().bind_addr(), "localhost:8765");
    }
}
