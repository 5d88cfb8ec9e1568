use crate::core::link::PortEnumerator;
use crate::domain::{error::BridgeResult, protocol::PortDescriptor};
use serialport::SerialPortType;
use tracing::debug;

/// Queries the operating system for serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPortEnumerator;

impl PortEnumerator for SystemPortEnumerator {
    fn list_ports(&self) -> BridgeResult<Vec<PortDescriptor>> {
        let ports = serialport::available_ports()?;
        debug!("Found {} serial ports", ports.len());

        Ok(ports
            .into_iter()
            .map(|info| PortDescriptor {
                description: describe(&info.port_type),
                port: info.port_name,
            })
            .collect())
    }
}

/// Human readable description for a port, `n/a` when nothing is known.
fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_else(|| format!("USB device {:04x}:{:04x}", usb.vid, usb.pid)),
        SerialPortType::PciPort => "PCI device".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth device".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}
