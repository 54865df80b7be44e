//! Transport binding.
//!
//! The core never opens a socket. It sees the outside world only through
//! this one-method trait; the real delivery mechanism (push channel,
//! mailbox, relay) is an external collaborator supplied by the embedding
//! application.

use crate::error::EconnError;

/// A single outbound send operation.
///
/// Any error returned here propagates back through the triggering
/// `Connection` operation — there is no retry policy in the
/// core; the caller decides whether to surface it to the user.
pub trait Transport {
    fn send(&mut self, encoded: &str) -> Result<(), EconnError>;
}

/// An in-memory [`Transport`] used by this crate's own integration tests.
/// Not a production transport — queue up
/// a pair of these, one per side, and drain one into the other's
/// [`crate::Connection::recv`] to simulate delivery.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    outbox: std::collections::VecDeque<String>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest queued outbound message, if any.
    pub fn drain_one(&mut self) -> Option<String> {
        self.outbox.pop_front()
    }

    /// Pop every queued outbound message, oldest first.
    pub fn drain_all(&mut self) -> Vec<String> {
        self.outbox.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.is_empty()
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, encoded: &str) -> Result<(), EconnError> {
        self.outbox.push_back(encoded.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_sent_messages_in_order() {
        let mut t = LoopbackTransport::new();
        t.send("first").unwrap();
        t.send("second").unwrap();
        assert_eq!(t.drain_one().as_deref(), Some("first"));
        assert_eq!(t.drain_all(), vec!["second".to_string()]);
        assert!(t.is_empty());
    }
}
