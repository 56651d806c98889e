//! Durable offline outbound queue.
//!
//! Messages composed while the transport is down land here and survive an
//! app restart. Order is insertion order, always: the queue never
//! reorders, and nothing leaves it except a flush or an explicit cancel.
//!
//! Persistence is best-effort: a failing store is logged and the in-memory
//! queue stays authoritative for the current process lifetime.

use std::collections::VecDeque;

use matchwire_proto::{MatchId, OutboundMessage};
use serde::{Deserialize, Serialize};

use crate::storage::QueueStore;

/// One outbound chat message awaiting a live connection.
///
/// `message.content` is already sealed; the queue never sees plaintext.
/// Entries are never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineMessage {
    /// Locally generated unique token.
    pub id: u64,

    /// Target conversation.
    pub match_id: MatchId,

    /// The sealed message to deliver.
    pub message: OutboundMessage,
}

/// FIFO queue of outbound messages with write-through persistence.
#[derive(Debug)]
pub struct OfflineQueue<S: QueueStore> {
    entries: VecDeque<OfflineMessage>,
    store: S,
    /// Whether a previous process lifetime's queue has been loaded.
    hydrated: bool,
}

impl<S: QueueStore> OfflineQueue<S> {
    /// Create a queue backed by the given store.
    ///
    /// Persisted entries from a previous process lifetime are loaded
    /// lazily, before the first enqueue or flush touches the queue.
    pub fn new(store: S) -> Self {
        Self { entries: VecDeque::new(), store, hydrated: false }
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the in-memory queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a message and persist the full queue.
    pub fn enqueue(&mut self, message: OfflineMessage) {
        self.ensure_hydrated();
        self.entries.push_back(message);
        self.persist();
    }

    /// Drain every queued message in insertion order.
    ///
    /// Invoked after every successful (re)connection. The persisted copy
    /// is cleared only once the full queue has been handed over. Flushing
    /// an empty queue performs no sends and no store writes.
    pub fn flush(&mut self) -> Vec<OfflineMessage> {
        self.ensure_hydrated();

        if self.entries.is_empty() {
            return Vec::new();
        }

        let drained: Vec<OfflineMessage> = self.entries.drain(..).collect();

        if let Err(error) = self.store.clear() {
            tracing::warn!(%error, "failed to clear persisted outbound queue");
        }

        drained
    }

    /// Remove a queued message by token. Returns whether it was present.
    pub fn cancel(&mut self, id: u64) -> bool {
        self.ensure_hydrated();

        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);

        let removed = self.entries.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Load the persisted queue once, before the first mutation.
    ///
    /// Persisted entries precede anything enqueued in this lifetime, so a
    /// restart cannot reorder messages composed before it.
    fn ensure_hydrated(&mut self) {
        if self.hydrated {
            return;
        }
        self.hydrated = true;

        match self.store.load() {
            Ok(persisted) if !persisted.is_empty() => {
                let fresh: Vec<OfflineMessage> = self.entries.drain(..).collect();
                self.entries = persisted.into();
                self.entries.extend(fresh);
            },
            Ok(_) => {},
            Err(error) => {
                tracing::warn!(%error, "failed to load persisted outbound queue");
            },
        }
    }

    fn persist(&mut self) {
        let entries = self.entries.make_contiguous();
        if let Err(error) = self.store.save(entries) {
            tracing::warn!(%error, "failed to persist outbound queue");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use matchwire_proto::MessageKind;
    use proptest::prelude::proptest;

    use super::*;
    use crate::storage::{MemoryStore, QueueStore as _};

    fn entry(id: u64, content: &str) -> OfflineMessage {
        OfflineMessage {
            id,
            match_id: "m1".into(),
            message: OutboundMessage {
                match_id: "m1".into(),
                content: content.into(),
                kind: MessageKind::Text,
            },
        }
    }

    #[test]
    fn flush_preserves_insertion_order() {
        let mut queue = OfflineQueue::new(MemoryStore::new());

        queue.enqueue(entry(1, "a"));
        queue.enqueue(entry(2, "b"));
        queue.enqueue(entry(3, "c"));

        let drained = queue.flush();
        let ids: Vec<u64> = drained.iter().map(|e| e.id).collect();

        assert_eq!(ids, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn flush_on_empty_queue_is_a_noop() {
        let mut queue = OfflineQueue::new(MemoryStore::new());

        assert!(queue.flush().is_empty());
        assert!(queue.flush().is_empty());
    }

    #[test]
    fn enqueue_writes_through_to_the_store() {
        let store = MemoryStore::new();
        let mut queue = OfflineQueue::new(store.clone());

        queue.enqueue(entry(1, "a"));
        queue.enqueue(entry(2, "b"));

        let persisted = store.load().unwrap();
        assert_eq!(persisted, vec![entry(1, "a"), entry(2, "b")]);
    }

    #[test]
    fn flush_clears_the_persisted_copy() {
        let store = MemoryStore::new();
        let mut queue = OfflineQueue::new(store.clone());

        queue.enqueue(entry(1, "a"));
        queue.flush();

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn restart_recovers_the_persisted_queue() {
        let store = MemoryStore::new();

        {
            let mut queue = OfflineQueue::new(store.clone());
            queue.enqueue(entry(1, "a"));
            queue.enqueue(entry(2, "b"));
            // Process dies before flushing
        }

        let mut revived = OfflineQueue::new(store);
        let drained = revived.flush();

        assert_eq!(drained, vec![entry(1, "a"), entry(2, "b")]);
    }

    #[test]
    fn restart_then_enqueue_keeps_persisted_entries_first() {
        let store = MemoryStore::new();

        {
            let mut queue = OfflineQueue::new(store.clone());
            queue.enqueue(entry(1, "old"));
        }

        let mut revived = OfflineQueue::new(store);
        revived.enqueue(entry(2, "new"));

        let ids: Vec<u64> = revived.flush().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn cancel_removes_a_single_entry() {
        let store = MemoryStore::new();
        let mut queue = OfflineQueue::new(store.clone());

        queue.enqueue(entry(1, "a"));
        queue.enqueue(entry(2, "b"));
        queue.enqueue(entry(3, "c"));

        assert!(queue.cancel(2));
        assert!(!queue.cancel(2));

        let ids: Vec<u64> = queue.flush().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn store_failure_keeps_in_memory_queue_authoritative() {
        let store = MemoryStore::failing();
        let mut queue = OfflineQueue::new(store);

        queue.enqueue(entry(1, "a"));
        queue.enqueue(entry(2, "b"));

        // Persistence failed, but the messages are still deliverable
        let ids: Vec<u64> = queue.flush().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    proptest! {
        #[test]
        fn arbitrary_batches_flush_in_order(contents in proptest::collection::vec(".{0,16}", 0..32)) {
            let mut queue = OfflineQueue::new(MemoryStore::new());

            for (i, content) in contents.iter().enumerate() {
                queue.enqueue(entry(i as u64, content));
            }

            let drained = queue.flush();
            let ids: Vec<u64> = drained.iter().map(|e| e.id).collect();
            let expected: Vec<u64> = (0..contents.len() as u64).collect();

            assert_eq!(ids, expected);
        }
    }
}
