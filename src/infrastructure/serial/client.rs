use crate::core::link::{LineSource, LinkOpener};
use crate::domain::{
    config::{FlowControlConfig, LinkConfig, ParityConfig},
    error::{BridgeError, BridgeResult},
};
use serialport::SerialPort;
use std::io::{self, BufRead, BufReader, Read};
use tracing::{debug, info, warn};

/// Line reader over an open serial port.
///
/// Bytes of an unfinished line are kept across read timeouts and joined with
/// the rest once the terminating newline arrives. A line that reaches
/// `max_line` bytes without a newline is returned as is.
pub struct SerialLineReader {
    reader: BufReader<Box<dyn SerialPort>>,
    pending: Vec<u8>,
    max_line: usize,
}

impl SerialLineReader {
    pub fn new(port: Box<dyn SerialPort>, max_line: usize) -> Self {
        Self {
            reader: BufReader::new(port),
            pending: Vec::with_capacity(256),
            max_line: max_line.max(1),
        }
    }

    fn take_line(&mut self) -> String {
        let line = decode_dropping_invalid(&self.pending);
        self.pending.clear();
        line
    }
}

impl LineSource for SerialLineReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let budget = self.max_line.saturating_sub(self.pending.len()) as u64;
        let read = (&mut self.reader)
            .take(budget)
            .read_until(b'\n', &mut self.pending);

        match read {
            Ok(_) if self.pending.last() == Some(&b'\n') => {
                let line = self.take_line();
                debug!("Read {} byte line from serial", line.len());
                Ok(Some(line))
            }
            Ok(_) if self.pending.len() >= self.max_line => {
                warn!(
                    "Serial line exceeded {} bytes without a newline, forwarding it",
                    self.max_line
                );
                Ok(Some(self.take_line()))
            }
            // Some drivers report a timeout as a zero-length read
            Ok(_) => Ok(None),
            Err(ref e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Decode `bytes` as UTF-8, dropping invalid sequences instead of replacing them.
fn decode_dropping_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Opens real serial ports through the `serialport` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

impl SerialOpener {
    fn builder(config: &LinkConfig) -> BridgeResult<serialport::SerialPortBuilder> {
        let invalid = |message: String| BridgeError::LinkOpen {
            port: config.port.clone(),
            message,
        };

        let data_bits = match config.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => return Err(invalid(format!("Invalid data bits: {}", other))),
        };

        let stop_bits = match config.stop_bits {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            other => return Err(invalid(format!("Invalid stop bits: {}", other))),
        };

        let parity = match config.parity {
            ParityConfig::None => serialport::Parity::None,
            ParityConfig::Even => serialport::Parity::Even,
            ParityConfig::Odd => serialport::Parity::Odd,
        };

        let flow_control = match config.flow_control {
            FlowControlConfig::None => serialport::FlowControl::None,
            FlowControlConfig::Software => serialport::FlowControl::Software,
            FlowControlConfig::Hardware => serialport::FlowControl::Hardware,
        };

        Ok(serialport::new(&config.port, config.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(flow_control)
            .timeout(config.read_timeout))
    }
}

impl LinkOpener for SerialOpener {
    fn open(&self, config: &LinkConfig) -> BridgeResult<Box<dyn LineSource>> {
        let port = Self::builder(config)?
            .open()
            .map_err(|e| BridgeError::LinkOpen {
                port: config.port.clone(),
                message: e.to_string(),
            })?;

        info!("Serial port {} opened at {} baud", config.port, config.baud_rate);

        Ok(Box::new(SerialLineReader::new(port, config.max_line_bytes)))
    }
}
