//! Per-connection session state and the connection state machine.

use crate::protocol::InboundFrame;

/// Connection lifecycle states.
///
/// A session starts `Disconnected`, moves to `Handshaking` when the port
/// opens and the connect query goes out, and reaches `Connected` once the
/// firmware answers with its version. A rejected handshake reply leaves the
/// session `Handshaking`; there is no automatic retry. `Errored` is terminal
/// and reachable from any state on transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport yet.
    Disconnected,
    /// Connect query sent, awaiting the version reply.
    Handshaking,
    /// Handshake complete.
    Connected,
    /// Transport failed; the session will not recover.
    Errored,
}

/// Mutable state of one driver session.
///
/// Owned by the I/O task and mutated only there; the response dispatcher is
/// the sole writer of the protocol-derived fields.
#[derive(Debug)]
pub struct SessionState {
    /// Where the connection state machine currently stands.
    pub connection: ConnectionState,
    /// Firmware version captured from the handshake, `(major, minor)`.
    pub firmware_version: Option<(u8, u8)>,
    /// Displayed number, known only after a get-number reply.
    pub displayed_number: Option<u32>,
    /// The last frame decoded from the wire.
    pub last_frame: InboundFrame,
}

impl SessionState {
    /// Create a fresh, disconnected session.
    pub fn new() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            firmware_version: None,
            displayed_number: None,
            last_frame: InboundFrame::new(),
        }
    }

    /// Whether the handshake has completed.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Firmware version as the device reports it, `"<major>.<minor>"`.
    pub fn version_string(&self) -> Option<String> {
        self.firmware_version
            .map(|(major, minor)| format!("{major}.{minor}"))
    }

    /// Return to `Disconnected`, dropping everything learned from the device.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Enter the terminal `Errored` state.
    pub fn fail(&mut self) {
        self.connection = ConnectionState::Errored;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_disconnected() {
        let state = SessionState::new();
        assert_eq!(state.connection, ConnectionState::Disconnected);
        assert!(!state.is_connected());
        assert_eq!(state.firmware_version, None);
        assert_eq!(state.displayed_number, None);
    }

    #[test]
    fn test_version_string_format() {
        let mut state = SessionState::new();
        assert_eq!(state.version_string(), None);

        state.firmware_version = Some((1, 4));
        assert_eq!(state.version_string(), Some("1.4".to_string()));
    }

    #[test]
    fn test_reset_drops_device_state() {
        let mut state = SessionState::new();
        state.connection = ConnectionState::Connected;
        state.firmware_version = Some((1, 0));
        state.displayed_number = Some(42);

        state.reset();

        assert_eq!(state.connection, ConnectionState::Disconnected);
        assert_eq!(state.firmware_version, None);
        assert_eq!(state.displayed_number, None);
    }

    #[test]
    fn test_fail_is_terminal_marker() {
        let mut state = SessionState::new();
        state.connection = ConnectionState::Handshaking;
        state.fail();
        assert_eq!(state.connection, ConnectionState::Errored);
    }
}
