//! Protocol module - wire format, framing, and command codes.
//!
//! This module implements the binary protocol spoken over the serial link:
//! - `[length:1][command:1][payload:length]` frame encoding
//! - Lenient decoding of inbound chunks into the session's last frame
//! - The closed command-code enumeration
//! - 4-byte little-endian value encoding

mod command;
mod frame;

pub use command::{Command, CONNECT_MAGIC};
pub use frame::{
    payload_to_value, value_to_payload, Frame, InboundFrame, HEADER_SIZE, MIN_FRAME_SIZE,
    VALUE_SIZE,
};
