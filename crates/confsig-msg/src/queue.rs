//! ---
//! confsig_section: "02-signaling-messages"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Signaling wire types, transport boundary, and outgoing queue."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::time::Instant;

use serde_json::Value as JsonValue;

/// Outgoing message awaiting acknowledgment.
///
/// `R` is the completion handle the owner uses to report the outcome.
#[derive(Debug)]
pub struct PendingMessage<R> {
    /// Identifier allocated when the message was enqueued.
    pub id: u64,
    /// Event name.
    pub event: String,
    /// Event payload.
    pub payload: JsonValue,
    /// Completion handle, consumed when the message leaves the queue.
    pub responder: R,
    /// When the message entered the queue.
    pub enqueued_at: Instant,
}

/// FIFO of unacknowledged outgoing messages plus the identifier allocator.
///
/// Identifiers strictly increase in insertion order and are never reused, even
/// after [`OutgoingQueue::take_all`]. The queue carries no lock of its own; the
/// owner serializes access together with its connection state.
#[derive(Debug)]
pub struct OutgoingQueue<R> {
    next_id: u64,
    pending: VecDeque<PendingMessage<R>>,
}

impl<R> Default for OutgoingQueue<R> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: VecDeque::new(),
        }
    }
}

impl<R> OutgoingQueue<R> {
    /// Create an empty queue whose first identifier is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identifier and append a message to the tail.
    pub fn push(&mut self, event: impl Into<String>, payload: JsonValue, responder: R) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.pending.push_back(PendingMessage {
            id,
            event: event.into(),
            payload,
            responder,
            enqueued_at: Instant::now(),
        });
        id
    }

    /// Remove the message with `id`, if it is still pending.
    pub fn remove(&mut self, id: u64) -> Option<PendingMessage<R>> {
        // Ids are sorted, so the position can be found by binary search.
        let index = self
            .pending
            .binary_search_by_key(&id, |message| message.id)
            .ok()?;
        self.pending.remove(index)
    }

    /// Empty the queue, returning every pending message in FIFO order.
    pub fn take_all(&mut self) -> Vec<PendingMessage<R>> {
        self.pending.drain(..).collect()
    }

    /// Iterate pending messages in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingMessage<R>> {
        self.pending.iter()
    }

    /// Identifiers of pending messages in FIFO order.
    pub fn ids(&self) -> Vec<u64> {
        self.pending.iter().map(|message| message.id).collect()
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no message is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Last identifier handed out (0 before the first push).
    pub fn last_id(&self) -> u64 {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_increase_in_insertion_order() {
        let mut queue = OutgoingQueue::new();
        let a = queue.push("publish", json!({}), ());
        let b = queue.push("signaling_message", json!({}), ());
        let c = queue.push("control", json!({}), ());
        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(queue.ids(), vec![1, 2, 3]);
    }

    #[test]
    fn remove_is_at_most_once() {
        let mut queue = OutgoingQueue::new();
        let first = queue.push("publish", json!({}), "first");
        let second = queue.push("subscribe", json!({}), "second");

        let removed = queue.remove(second).expect("second pending");
        assert_eq!(removed.responder, "second");
        assert!(queue.remove(second).is_none());
        assert_eq!(queue.ids(), vec![first]);
    }

    #[test]
    fn ids_are_not_reused_after_take_all() {
        let mut queue = OutgoingQueue::new();
        queue.push("publish", json!({}), ());
        queue.push("publish", json!({}), ());
        let taken = queue.take_all();
        assert_eq!(taken.len(), 2);
        assert!(queue.is_empty());

        let next = queue.push("publish", json!({}), ());
        assert_eq!(next, 3);
        assert_eq!(queue.last_id(), 3);
    }
}
