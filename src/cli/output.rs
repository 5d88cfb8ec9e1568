use crate::cli::args::OutputFormat;
use crate::domain::config::BridgeConfig;
use crate::domain::protocol::PortDescriptor;
use std::io::{self, Write};
use std::path::Path;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_ports(&self, ports: &[PortDescriptor]) -> Result<(), OutputError>;
    fn write_config(&self, config: &BridgeConfig, source: Option<&Path>) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::BridgeError {
    fn from(err: OutputError) -> Self {
        match err {
            OutputError::JsonError(e) => Self::Json(e),
            OutputError::IoError(e) => Self::Io(e),
        }
    }
}

/// Writer rendering into any `io::Write`; the CLI uses stdout for results
/// and stderr for errors.
pub struct ConsoleWriter<W: Write = io::Stdout> {
    format: OutputFormat,
    out: std::cell::RefCell<W>,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self::with_writer(format, io::stdout())
    }
}

impl ConsoleWriter<io::Stderr> {
    pub fn stderr(format: OutputFormat) -> Self {
        Self::with_writer(format, io::stderr())
    }
}

impl<W: Write> ConsoleWriter<W> {
    pub fn with_writer(format: OutputFormat, out: W) -> Self {
        Self {
            format,
            out: std::cell::RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn line(&self, text: &str) -> Result<(), OutputError> {
        writeln!(self.out.borrow_mut(), "{}", text)?;
        Ok(())
    }
}

impl<W: Write> OutputWriter for ConsoleWriter<W> {
    fn write_ports(&self, ports: &[PortDescriptor]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if ports.is_empty() {
                    self.line("No serial ports found")?;
                } else {
                    self.line("Available serial ports:")?;
                    for port in ports {
                        self.line(&format!("  {} - {}", port.port, port.description))?;
                    }
                }
            }
            OutputFormat::Json => {
                self.line(&serde_json::to_string_pretty(ports)?)?;
            }
            OutputFormat::Table => {
                if ports.is_empty() {
                    self.line("No serial ports found")?;
                } else {
                    let rows: Vec<PortTableRow> = ports.iter().map(PortTableRow::from).collect();
                    self.line(&Table::new(rows).to_string())?;
                }
            }
            OutputFormat::Csv => {
                self.line("port,description")?;
                for port in ports {
                    self.line(&format!("{},{}", port.port, csv_field(&port.description)))?;
                }
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &BridgeConfig, source: Option<&Path>) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text | OutputFormat::Table | OutputFormat::Csv => {
                self.line("SerialBridge Configuration:")?;
                match source {
                    Some(path) => self.line(&format!("  Loaded from: {}", path.display()))?,
                    None => self.line("  Loaded from: built-in defaults")?,
                }
                self.line(&format!("  Log level: {}", config.global.log_level))?;
                self.line(&format!("  Notify link drop: {}", config.global.notify_link_drop))?;
                self.line(&format!("  Listen: {}", config.server.bind_addr()))?;
                self.line(&format!("  Default baud rate: {}", config.serial.default_baud_rate))?;
                self.line(&format!(
                    "  Framing: {} data bits, {} stop bits, parity {:?}, flow control {:?}",
                    config.serial.data_bits,
                    config.serial.stop_bits,
                    config.serial.parity,
                    config.serial.flow_control
                ))?;
                self.line(&format!("  Read timeout: {}ms", config.serial.read_timeout_ms))?;
                self.line(&format!("  Idle backoff: {}ms", config.serial.idle_backoff_ms))?;
                self.line(&format!("  Max line length: {} bytes", config.serial.max_line_bytes))?;
            }
            OutputFormat::Json => {
                self.line(&serde_json::to_string_pretty(config)?)?;
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                self.line(&serde_json::json!({ "message": message }).to_string())?;
            }
            _ => self.line(message)?,
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                self.line(&serde_json::json!({ "error": error }).to_string())?;
            }
            _ => self.line(&format!("Error: {}", error))?,
        }
        Ok(())
    }
}

/// Table row for one serial port
#[derive(Tabled)]
struct PortTableRow {
    port: String,
    description: String,
}

impl From<&PortDescriptor> for PortTableRow {
    fn from(port: &PortDescriptor) -> Self {
        Self {
            port: port.port.clone(),
            description: port.description.clone(),
        }
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
