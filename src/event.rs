//! Driver events delivered to registered listeners.
//!
//! Events are fire-and-forget notifications of state changes: at most once
//! per occurrence, never replayed. Listeners are unbounded channel senders
//! registered with the I/O task; closed receivers are pruned on the next
//! emission.

use tokio::sync::mpsc;

/// Events produced by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Serial port opened; the handshake is about to start.
    Open,

    /// Connect handshake succeeded.
    Connected {
        /// Firmware version reported by the device, `"<major>.<minor>"`.
        version: String,
    },

    /// A get-number reply refreshed the displayed number.
    Updated {
        /// Number currently shown on the array.
        number: u32,
    },

    /// Transport reached a clean end of stream.
    Close,

    /// Link lost following a transport error (device unplugged mid-session).
    Disconnect,

    /// Protocol or transport failure.
    Error {
        /// Error description.
        message: String,
    },
}

/// Registered event listeners.
#[derive(Debug, Default)]
pub(crate) struct Listeners {
    senders: Vec<mpsc::UnboundedSender<Event>>,
}

impl Listeners {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a listener channel.
    pub(crate) fn register(&mut self, tx: mpsc::UnboundedSender<Event>) {
        self.senders.push(tx);
    }

    /// Deliver an event to every live listener, dropping closed ones.
    pub(crate) fn emit(&mut self, event: Event) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
