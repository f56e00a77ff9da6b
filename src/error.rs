//! Error types for the nixiepipe driver.

use thiserror::Error;

/// Main error type for all driver operations.
#[derive(Debug, Error)]
pub enum PipeError {
    /// I/O error on the underlying byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port enumeration or open failure.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// No serial port matched the device descriptor during auto-detection.
    #[error("no Nixie Pipe device found on any serial port")]
    DeviceNotFound,

    /// The connect handshake reply was rejected.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The device never answered the connect handshake.
    #[error("timed out waiting for connection handshake")]
    ConnectTimeout,

    /// The driver task has shut down (port closed or errored).
    #[error("connection closed")]
    Disconnected,
}

/// Result type alias using PipeError.
pub type Result<T> = std::result::Result<T, PipeError>;
