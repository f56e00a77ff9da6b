//! Single-outstanding command queue.
//!
//! The firmware executes commands synchronously and disables command
//! acceptance while refreshing the display, so the driver must never put a
//! second frame on the wire before the first is answered. [`CommandQueue`]
//! enforces that discipline: one outstanding frame, everything else buffered
//! in submission order.
//!
//! The queue is a pure state machine. It never touches the transport itself;
//! instead [`submit`](CommandQueue::submit) and
//! [`response_received`](CommandQueue::response_received) return the frame
//! that is now due for writing, and the I/O task performs the write. This
//! keeps every transport interaction in one place and makes the ordering
//! rules testable without I/O.

use std::collections::VecDeque;

use crate::protocol::Frame;

/// FIFO queue enforcing at most one in-flight command.
#[derive(Debug, Default)]
pub struct CommandQueue {
    /// True iff a written frame has no processed reply yet.
    outstanding: bool,
    /// Frames waiting their turn, in submission order.
    pending: VecDeque<Frame>,
}

impl CommandQueue {
    /// Create an empty, idle queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a frame for transmission.
    ///
    /// Returns `Some(frame)` when the line is idle: the caller must write it
    /// now and the queue marks it outstanding. Returns `None` when a command
    /// is already in flight; the frame is buffered at the tail and will be
    /// handed back by a later [`response_received`](Self::response_received).
    pub fn submit(&mut self, frame: Frame) -> Option<Frame> {
        if self.outstanding {
            self.pending.push_back(frame);
            None
        } else {
            self.outstanding = true;
            Some(frame)
        }
    }

    /// Record that an inbound frame was processed.
    ///
    /// Called exactly once per decoded inbound frame, regardless of command
    /// code. Returns `Some(frame)` when a pending frame is released for
    /// writing (the line stays outstanding); `None` when the queue drained
    /// and the line is idle again.
    pub fn response_received(&mut self) -> Option<Frame> {
        match self.pending.pop_front() {
            Some(next) => Some(next),
            None => {
                self.outstanding = false;
                None
            }
        }
    }

    /// Whether a command is currently in flight.
    #[inline]
    pub fn is_outstanding(&self) -> bool {
        self.outstanding
    }

    /// Number of frames waiting behind the in-flight command.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop all pending frames and clear the outstanding flag.
    ///
    /// Used when the transport is lost; queued frames can never be sent.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.outstanding = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Command;

    fn frame(tag: u8) -> Frame {
        Frame::new(Command::SetPipeNumber, vec![tag, 0])
    }

    #[test]
    fn test_idle_submit_writes_immediately() {
        let mut queue = CommandQueue::new();

        let released = queue.submit(frame(1));
        assert_eq!(released, Some(frame(1)));
        assert!(queue.is_outstanding());
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn test_at_most_one_outstanding() {
        let mut queue = CommandQueue::new();

        // First of N submissions goes out; the other N-1 are held.
        assert!(queue.submit(frame(0)).is_some());
        for tag in 1..5 {
            assert_eq!(queue.submit(frame(tag)), None);
        }
        assert!(queue.is_outstanding());
        assert_eq!(queue.pending_len(), 4);
    }

    #[test]
    fn test_fifo_release_order() {
        let mut queue = CommandQueue::new();

        queue.submit(frame(0));
        for tag in 1..4 {
            queue.submit(frame(tag));
        }

        for tag in 1..4 {
            let released = queue.response_received();
            assert_eq!(released, Some(frame(tag)));
            assert!(queue.is_outstanding());
        }

        // Final response drains the queue and idles the line.
        assert_eq!(queue.response_received(), None);
        assert!(!queue.is_outstanding());
    }

    #[test]
    fn test_response_on_idle_queue_stays_idle() {
        let mut queue = CommandQueue::new();

        assert_eq!(queue.response_received(), None);
        assert!(!queue.is_outstanding());
    }

    #[test]
    fn test_submit_after_drain_writes_immediately() {
        let mut queue = CommandQueue::new();

        queue.submit(frame(1));
        queue.response_received();

        assert_eq!(queue.submit(frame(2)), Some(frame(2)));
    }

    #[test]
    fn test_clear_resets_state() {
        let mut queue = CommandQueue::new();

        queue.submit(frame(1));
        queue.submit(frame(2));
        queue.clear();

        assert!(!queue.is_outstanding());
        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.submit(frame(3)), Some(frame(3)));
    }
}
