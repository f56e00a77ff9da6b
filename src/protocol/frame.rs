//! Frame encoding and lenient inbound decoding.
//!
//! The wire format is `[length:1][command:1][payload:length]`. Outbound frames
//! are built from a typed [`Command`] and a payload; inbound chunks decode into
//! an [`InboundFrame`] that the session keeps across reads.
//!
//! # Example
//!
//! ```
//! use nixiepipe::protocol::{Command, Frame};
//!
//! let frame = Frame::new(Command::SetColour, vec![0, 0, 255]);
//! assert_eq!(&frame.encode()[..], &[0x03, 0x42, 0x00, 0x00, 0xFF]);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::command::Command;

/// Frame header size: length byte plus command byte.
pub const HEADER_SIZE: usize = 2;

/// Minimum wire size of a decodable frame.
///
/// Anything shorter carries no payload byte at all and is discarded.
pub const MIN_FRAME_SIZE: usize = 3;

/// Wire width of a multi-byte numeric value.
pub const VALUE_SIZE: usize = 4;

/// An outbound protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: Command,
    payload: Bytes,
}

impl Frame {
    /// Create a new frame from a command and payload.
    pub fn new(command: Command, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    /// Get the command code.
    #[inline]
    pub fn command(&self) -> Command {
        self.command
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encode the frame for the wire.
    ///
    /// Byte 0 is the payload length masked to 8 bits, byte 1 the command code,
    /// the rest the payload. Total wire size is `payload.len() + 2`.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_u8((self.payload.len() & 0xFF) as u8);
        buf.put_u8(self.command.code());
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// The last inbound frame decoded from the wire.
///
/// The device answers one frame per command, but the serial layer hands the
/// driver raw chunks. Decoding is lenient: a chunk shorter than the size it
/// claims populates only the message bytes actually present, and the rest keep
/// whatever a previous frame left there (zero when never written). Handlers
/// validate the claimed [`size`](Self::size) before trusting the message.
#[derive(Debug, Clone, Default)]
pub struct InboundFrame {
    size: u8,
    command: u8,
    message: BytesMut,
}

impl InboundFrame {
    /// Create an empty frame (no data decoded yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one raw chunk into this frame.
    ///
    /// Returns `false` without touching the frame when the chunk is shorter
    /// than [`MIN_FRAME_SIZE`]; such chunks are malformed and dropped silently.
    pub fn absorb(&mut self, chunk: &[u8]) -> bool {
        if chunk.len() < MIN_FRAME_SIZE {
            return false;
        }

        self.size = chunk[0];
        self.command = chunk[1];

        let body = &chunk[HEADER_SIZE..];
        if self.message.len() < body.len() {
            self.message.resize(body.len(), 0);
        }
        self.message[..body.len()].copy_from_slice(body);

        true
    }

    /// Claimed payload size from the frame header.
    #[inline]
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Raw command code from the frame header.
    #[inline]
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Message bytes backing the claimed size.
    ///
    /// Capped at the bytes actually received so far; never reads out of
    /// bounds.
    pub fn message(&self) -> &[u8] {
        let len = (self.size as usize).min(self.message.len());
        &self.message[..len]
    }

    /// A single message byte, defaulting to zero when absent.
    #[inline]
    pub fn byte(&self, index: usize) -> u8 {
        self.message.get(index).copied().unwrap_or(0)
    }
}

/// Encode a numeric value as a 4-byte little-endian payload.
#[inline]
pub fn value_to_payload(value: u32) -> [u8; VALUE_SIZE] {
    value.to_le_bytes()
}

/// Decode a numeric value from little-endian message bytes.
///
/// Sums `byte[i] << (8 * i)` over the bytes available, up to [`VALUE_SIZE`].
pub fn payload_to_value(message: &[u8]) -> u32 {
    message
        .iter()
        .take(VALUE_SIZE)
        .enumerate()
        .fold(0u32, |value, (i, &b)| value | (u32::from(b) << (8 * i)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let frame = Frame::new(Command::SetPipeColour, vec![1, 128, 128, 0]);
        assert_eq!(frame.command(), Command::SetPipeColour);
        assert_eq!(frame.payload(), &[1, 128, 128, 0]);

        let bytes = frame.encode();

        assert_eq!(bytes[0], 4);
        assert_eq!(bytes[1], 0x43);
        assert_eq!(&bytes[2..], &[1, 128, 128, 0]);
        assert_eq!(bytes.len(), HEADER_SIZE + 4);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let payloads: &[&[u8]] = &[&[1], &[0x4E, 0x50], &[0x39, 0x30, 0x00, 0x00]];

        for payload in payloads {
            let frame = Frame::new(Command::GetNumber, payload.to_vec());
            let wire = frame.encode();

            let mut inbound = InboundFrame::new();
            assert!(inbound.absorb(&wire));
            assert_eq!(inbound.size() as usize, payload.len());
            assert_eq!(inbound.command(), Command::GetNumber.code());
            assert_eq!(inbound.message(), *payload);
        }
    }

    #[test]
    fn test_short_chunk_discarded() {
        let mut inbound = InboundFrame::new();
        assert!(inbound.absorb(&[2, 0x48, 1, 0]));

        // A malformed chunk must leave the previous frame untouched.
        assert!(!inbound.absorb(&[]));
        assert!(!inbound.absorb(&[0x48]));
        assert!(!inbound.absorb(&[2, 0x48]));

        assert_eq!(inbound.size(), 2);
        assert_eq!(inbound.command(), 0x48);
        assert_eq!(inbound.message(), &[1, 0]);
    }

    #[test]
    fn test_lenient_fill_keeps_prior_bytes() {
        let mut inbound = InboundFrame::new();
        assert!(inbound.absorb(&[4, 0x47, 0xAA, 0xBB, 0xCC, 0xDD]));

        // Truncated chunk: claims 4 bytes but carries only 1. The missing
        // tail reads as the prior frame's bytes.
        assert!(inbound.absorb(&[4, 0x47, 0x11]));
        assert_eq!(inbound.message(), &[0x11, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn test_lenient_fill_defaults_to_zero() {
        let mut inbound = InboundFrame::new();

        // First ever chunk claims more than it carries: absent bytes are zero.
        assert!(inbound.absorb(&[2, 0x48, 0x07]));
        assert_eq!(inbound.byte(0), 0x07);
        assert_eq!(inbound.byte(1), 0);
        assert_eq!(inbound.message(), &[0x07]);
    }

    #[test]
    fn test_size_caps_message() {
        let mut inbound = InboundFrame::new();
        assert!(inbound.absorb(&[1, 0x45, 1, 99, 99]));
        assert_eq!(inbound.message(), &[1]);
    }

    #[test]
    fn test_value_little_endian() {
        // 12345 = 0x3039, least-significant byte first.
        assert_eq!(value_to_payload(12345), [0x39, 0x30, 0x00, 0x00]);
        assert_eq!(payload_to_value(&[0x39, 0x30, 0x00, 0x00]), 12345);
    }

    #[test]
    fn test_value_roundtrip() {
        for value in [0u32, 1, 255, 256, 9999, 0xDEAD_BEEF, u32::MAX] {
            assert_eq!(payload_to_value(&value_to_payload(value)), value);
        }
    }

    #[test]
    fn test_value_from_partial_message() {
        assert_eq!(payload_to_value(&[]), 0);
        assert_eq!(payload_to_value(&[0x39]), 0x39);
        assert_eq!(payload_to_value(&[0x39, 0x30]), 0x3039);
    }
}
