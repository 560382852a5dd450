//! FIFO queue for payloads accepted while disconnected.
//!
//! Payloads enter the queue already transformed by outgoing middleware and
//! leave it in the order they were issued. A payload is removed at the
//! instant it is handed to the transport, never earlier. The queue contents
//! serialize to JSON for mirroring to a [`QueueStore`](crate::QueueStore).

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use crate::error::Result;

// ============================================================================
// OutboundQueue
// ============================================================================

/// Ordered sequence of payloads awaiting transmission.
#[derive(Debug, Default)]
pub(crate) struct OutboundQueue {
    /// Pending payloads, front is next to transmit.
    items: VecDeque<String>,
}

impl OutboundQueue {
    /// Creates an empty queue.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a payload at the back.
    #[inline]
    pub fn push(&mut self, payload: String) {
        self.items.push_back(payload);
    }

    /// Removes and returns the next payload to transmit.
    #[inline]
    pub fn pop(&mut self) -> Option<String> {
        self.items.pop_front()
    }

    /// Returns the number of pending payloads.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no payloads are pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replaces the queue contents wholesale.
    ///
    /// Used when loading a persisted queue: the persisted copy overwrites
    /// the in-memory one.
    #[inline]
    pub fn replace(&mut self, items: Vec<String>) {
        self.items = items.into();
    }

    /// Serializes the queue contents to JSON.
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.items)?)
    }

    /// Parses queue contents from JSON.
    pub fn deserialize(json: &str) -> Result<Vec<String>> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = OutboundQueue::new();
        queue.push("a".to_string());
        queue.push("b".to_string());
        queue.push("c".to_string());

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(), Some("a".to_string()));
        assert_eq!(queue.pop(), Some("b".to_string()));
        assert_eq!(queue.pop(), Some("c".to_string()));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_replace_overwrites() {
        let mut queue = OutboundQueue::new();
        queue.push("stale".to_string());

        queue.replace(vec!["x".to_string(), "y".to_string()]);

        assert_eq!(queue.pop(), Some("x".to_string()));
        assert_eq!(queue.pop(), Some("y".to_string()));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut queue = OutboundQueue::new();
        queue.push("one".to_string());
        queue.push("two".to_string());

        let json = queue.serialize().expect("serialize");
        let items = OutboundQueue::deserialize(&json).expect("deserialize");

        assert_eq!(items, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        assert!(OutboundQueue::deserialize("not json").is_err());
    }

    proptest! {
        /// Payloads drain in exactly the order they were pushed, for any
        /// sequence, including through a serialize/deserialize cycle.
        #[test]
        fn prop_fifo_preserved(payloads in proptest::collection::vec(".*", 0..64)) {
            let mut queue = OutboundQueue::new();
            for payload in &payloads {
                queue.push(payload.clone());
            }

            let json = queue.serialize().expect("serialize");
            let mut restored = OutboundQueue::new();
            restored.replace(OutboundQueue::deserialize(&json).expect("deserialize"));

            let mut drained = Vec::new();
            while let Some(payload) = restored.pop() {
                drained.push(payload);
            }
            prop_assert_eq!(drained, payloads);
        }
    }
}
