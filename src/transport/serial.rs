//! Serial port discovery and opening.
//!
//! The Nixie Pipe Master enumerates as a USB CDC serial device. When the
//! caller does not name a port, [`discover_port`] scans the system's serial
//! ports for one whose USB manufacturer descriptor matches the device vendor.

use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};

use crate::error::{PipeError, Result};

/// Baud rate the firmware listens at.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// USB manufacturer string identifying a Nixie Pipe Master.
pub const DEVICE_MANUFACTURER: &str = "JBR Engineering";

/// Serial port configuration.
#[derive(Debug, Clone)]
pub struct PortConfig {
    /// Line speed; the firmware only speaks [`DEFAULT_BAUD_RATE`].
    pub baud_rate: u32,
    /// Open the port as part of connecting. [`crate::DeviceBuilder::connect`]
    /// is itself the explicit open call, so this is informational and kept
    /// for configuration compatibility.
    pub auto_open: bool,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            auto_open: true,
        }
    }
}

/// Find the serial port a Nixie Pipe Master is attached to.
///
/// Scans available ports and returns the first USB port whose manufacturer
/// descriptor contains [`DEVICE_MANUFACTURER`].
///
/// # Errors
///
/// [`PipeError::DeviceNotFound`] when no port matches;
/// [`PipeError::Serial`] when enumeration itself fails.
pub fn discover_port() -> Result<String> {
    let ports = tokio_serial::available_ports()?;

    for port in ports {
        if let SerialPortType::UsbPort(info) = &port.port_type {
            let matches = info
                .manufacturer
                .as_deref()
                .is_some_and(|m| m.contains(DEVICE_MANUFACTURER));
            if matches {
                tracing::debug!(port = %port.port_name, "matched Nixie Pipe device");
                return Ok(port.port_name);
            }
        }
    }

    Err(PipeError::DeviceNotFound)
}

/// Open `path` at the configured baud rate.
pub fn open_port(path: &str, config: &PortConfig) -> Result<SerialStream> {
    let stream = tokio_serial::new(path, config.baud_rate).open_native_async()?;
    tracing::debug!(path, baud = config.baud_rate, "serial port open");
    Ok(stream)
}
