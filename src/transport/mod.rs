//! Transport module - serial port discovery and opening.
//!
//! The driver core is generic over any `AsyncRead + AsyncWrite` byte stream;
//! this module provides the real one. It finds the device by USB descriptor,
//! opens the port at the protocol baud rate, and hands the stream to the
//! I/O task.

mod serial;

pub use serial::{discover_port, open_port, PortConfig, DEFAULT_BAUD_RATE, DEVICE_MANUFACTURER};
