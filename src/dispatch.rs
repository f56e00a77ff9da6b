//! Response dispatch by command code.
//!
//! Routes the session's just-decoded inbound frame to its handler. The table
//! is a closed match over [`Command`], so an unhandled code is an explicit
//! arm rather than a failed lookup. Only two codes carry data back from the
//! device; everything else (including codes outside the protocol) is ignored
//! here and matters only for releasing the command queue, which the I/O task
//! does unconditionally after each dispatch.

use crate::event::Event;
use crate::protocol::{payload_to_value, Command};
use crate::session::{ConnectionState, SessionState};

/// Dispatch the session's last inbound frame.
///
/// Mutates the session according to the frame's command code and returns the
/// event to deliver, if any.
pub(crate) fn dispatch(state: &mut SessionState) -> Option<Event> {
    match Command::from_wire(state.last_frame.command()) {
        Some(Command::Connect) => on_connect(state),
        Some(Command::GetNumber) => on_get_number(state),
        _ => None,
    }
}

/// Connect handshake reply: capture the firmware version.
///
/// The reply carries `[minor, major]` - reversed relative to the generic
/// little-endian value decode. A reply of the wrong size rejects the
/// handshake with an error event and leaves the state machine where it was.
fn on_connect(state: &mut SessionState) -> Option<Event> {
    let expected = Command::Connect.reply_len().unwrap_or(0);
    if state.last_frame.size() as usize != expected {
        return Some(Event::Error {
            message: format!(
                "invalid connection handshake: expected {expected} payload bytes, got {}",
                state.last_frame.size()
            ),
        });
    }

    let minor = state.last_frame.byte(0);
    let major = state.last_frame.byte(1);
    state.firmware_version = Some((major, minor));
    state.connection = ConnectionState::Connected;

    let version = format!("{major}.{minor}");
    tracing::info!(%version, "connected to Nixie Pipe");
    Some(Event::Connected { version })
}

/// Get-number reply: refresh the displayed number.
///
/// Unlike the connect handler, a size mismatch here is dropped without an
/// event.
fn on_get_number(state: &mut SessionState) -> Option<Event> {
    let expected = Command::GetNumber.reply_len().unwrap_or(0);
    if state.last_frame.size() as usize != expected {
        return None;
    }

    let number = payload_to_value(state.last_frame.message());
    state.displayed_number = Some(number);
    Some(Event::Updated { number })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absorbed(chunk: &[u8]) -> SessionState {
        let mut state = SessionState::new();
        state.connection = ConnectionState::Handshaking;
        assert!(state.last_frame.absorb(chunk));
        state
    }

    #[test]
    fn test_connect_success() {
        // [size, CONNECT, minor, major]
        let mut state = absorbed(&[0x02, 0x48, 4, 1]);

        let event = dispatch(&mut state);

        assert_eq!(
            event,
            Some(Event::Connected {
                version: "1.4".to_string()
            })
        );
        assert!(state.is_connected());
        assert_eq!(state.firmware_version, Some((1, 4)));
    }

    #[test]
    fn test_connect_size_mismatch_rejected() {
        let mut state = absorbed(&[0x01, 0x48, 0x00]);

        let event = dispatch(&mut state);

        assert!(matches!(event, Some(Event::Error { .. })));
        assert!(!state.is_connected());
        assert_eq!(state.connection, ConnectionState::Handshaking);
        assert_eq!(state.firmware_version, None);
    }

    #[test]
    fn test_get_number_updates_displayed_number() {
        let mut state = absorbed(&[0x04, 0x47, 0x39, 0x30, 0x00, 0x00]);

        let event = dispatch(&mut state);

        assert_eq!(event, Some(Event::Updated { number: 12345 }));
        assert_eq!(state.displayed_number, Some(12345));
    }

    #[test]
    fn test_get_number_size_mismatch_silently_ignored() {
        let mut state = absorbed(&[0x02, 0x47, 0x39, 0x30]);

        let event = dispatch(&mut state);

        assert_eq!(event, None);
        assert_eq!(state.displayed_number, None);
    }

    #[test]
    fn test_unhandled_codes_ignored() {
        // SHOW is a valid code with no response handler.
        let mut state = absorbed(&[0x01, 0x50, 0x01]);
        assert_eq!(dispatch(&mut state), None);

        // 0x99 is outside the protocol entirely.
        let mut state = absorbed(&[0x01, 0x99, 0x01]);
        assert_eq!(dispatch(&mut state), None);
        assert_eq!(state.displayed_number, None);
        assert!(!state.is_connected());
    }
}
