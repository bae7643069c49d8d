/// Fixed-capacity message cache for in-flight spray messages
///
/// An ordered set keyed by MessageId: most-recently-inserted at the front,
/// eviction removes the least-recently-inserted entry at the tail. Capacity
/// is bounded deterministically; when full, the oldest entry is dropped
/// silently even if undelivered.

use super::wire::{MessageId, SprayMessage, SummaryVector, MAX_VECTOR_ENTRIES};
use std::collections::VecDeque;

/// Default store capacity, shared with the wire vector bound
pub const MAX_MESSAGES: usize = MAX_VECTOR_ENTRIES;

/// FIFO message cache — insertion-ordered, duplicate-free by identity
///
/// Properties:
/// - `len() <= capacity` after every operation
/// - no two entries share a MessageId (callers check `contains` before
///   `insert_with_eviction`; insertion itself does not deduplicate)
/// - eviction order is insertion order, oldest first
pub struct MessageStore {
    /// Front = most recently inserted
    messages: VecDeque<SprayMessage>,
    capacity: usize,
}

impl MessageStore {
    /// Create an empty store with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(MAX_MESSAGES)
    }

    /// Create an empty store with a custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Exact-match lookup on the {source, destination, sequence} triple
    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| m.id == *id)
    }

    pub fn get(&self, id: &MessageId) -> Option<&SprayMessage> {
        self.messages.iter().find(|m| m.id == *id)
    }

    pub fn get_mut(&mut self, id: &MessageId) -> Option<&mut SprayMessage> {
        self.messages.iter_mut().find(|m| m.id == *id)
    }

    /// Insert at the front, evicting the oldest entry first if at capacity.
    /// Returns the evicted message, if any.
    ///
    /// The caller is responsible for the duplicate check (`contains`);
    /// inserting an identity already present would violate the store's
    /// no-duplicates property.
    pub fn insert_with_eviction(&mut self, message: SprayMessage) -> Option<SprayMessage> {
        let evicted = if self.messages.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };
        self.messages.push_front(message);
        evicted
    }

    /// Remove the least-recently-inserted entry
    pub fn evict_oldest(&mut self) -> Option<SprayMessage> {
        self.messages.pop_back()
    }

    /// Remove a record by identity; called on confirmed final delivery
    pub fn remove(&mut self, id: &MessageId) -> Option<SprayMessage> {
        let pos = self.messages.iter().position(|m| m.id == *id)?;
        self.messages.remove(pos)
    }

    /// Insertion-order traversal, newest first
    pub fn iter(&self) -> impl Iterator<Item = &SprayMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Snapshot the cached identities as a summary vector, in iteration
    /// order, truncated to the wire bound
    pub fn summary(&self) -> SummaryVector {
        SummaryVector::from_ids(self.messages.iter().map(|m| m.id).collect())
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spray::wire::NodeAddress;
    use proptest::prelude::*;

    fn make_id(seq: u8) -> MessageId {
        MessageId::new(NodeAddress::new(128, 1), NodeAddress::new(128, 9), seq)
    }

    fn make_message(seq: u8) -> SprayMessage {
        SprayMessage::new(make_id(seq), 1_700_000_000, 8, b"m").unwrap()
    }

    #[test]
    fn test_insert_and_contains() {
        let mut store = MessageStore::new();
        store.insert_with_eviction(make_message(1));

        assert_eq!(store.len(), 1);
        assert!(store.contains(&make_id(1)));
        assert!(!store.contains(&make_id(2)));
    }

    #[test]
    fn test_identity_is_the_full_triple() {
        let mut store = MessageStore::new();
        store.insert_with_eviction(make_message(1));

        // same source and sequence, different destination
        let other = MessageId::new(NodeAddress::new(128, 1), NodeAddress::new(128, 3), 1);
        assert!(!store.contains(&other));
    }

    #[test]
    fn test_fifo_eviction_drops_oldest() {
        let mut store = MessageStore::new();
        for seq in 1..=5 {
            assert!(store.insert_with_eviction(make_message(seq)).is_none());
        }
        assert_eq!(store.len(), 5);

        let evicted = store.insert_with_eviction(make_message(6));
        assert_eq!(evicted.unwrap().id, make_id(1));
        assert_eq!(store.len(), 5);

        assert!(!store.contains(&make_id(1)));
        for seq in 2..=6 {
            assert!(store.contains(&make_id(seq)));
        }
    }

    #[test]
    fn test_remove_by_identity() {
        let mut store = MessageStore::new();
        store.insert_with_eviction(make_message(1));
        store.insert_with_eviction(make_message(2));

        let removed = store.remove(&make_id(1)).unwrap();
        assert_eq!(removed.id, make_id(1));
        assert_eq!(store.len(), 1);
        assert!(store.remove(&make_id(1)).is_none());
    }

    #[test]
    fn test_iter_newest_first() {
        let mut store = MessageStore::new();
        store.insert_with_eviction(make_message(1));
        store.insert_with_eviction(make_message(2));
        store.insert_with_eviction(make_message(3));

        let seqs: Vec<u8> = store.iter().map(|m| m.id.seq).collect();
        assert_eq!(seqs, vec![3, 2, 1]);
    }

    #[test]
    fn test_summary_matches_iteration_order() {
        let mut store = MessageStore::new();
        store.insert_with_eviction(make_message(1));
        store.insert_with_eviction(make_message(2));

        let summary = store.summary();
        assert_eq!(summary.ids(), &[make_id(2), make_id(1)]);
    }

    #[test]
    fn test_summary_of_empty_store() {
        let store = MessageStore::new();
        assert!(store.summary().is_empty());
    }

    #[test]
    fn test_get_mut_allows_copy_updates() {
        let mut store = MessageStore::new();
        store.insert_with_eviction(make_message(1));

        store.get_mut(&make_id(1)).unwrap().copies = 4;
        assert_eq!(store.get(&make_id(1)).unwrap().copies, 4);
    }

    proptest! {
        #[test]
        fn prop_capacity_invariant(seqs in proptest::collection::vec(0u8..=255, 0..64)) {
            let mut store = MessageStore::new();
            for seq in seqs {
                if !store.contains(&make_id(seq)) {
                    store.insert_with_eviction(make_message(seq));
                }
                prop_assert!(store.len() <= MAX_MESSAGES);
            }
        }

        #[test]
        fn prop_no_duplicate_identities(seqs in proptest::collection::vec(0u8..=7, 0..64)) {
            let mut store = MessageStore::new();
            for seq in seqs {
                if !store.contains(&make_id(seq)) {
                    store.insert_with_eviction(make_message(seq));
                }
                let mut ids: Vec<_> = store.iter().map(|m| m.id).collect();
                let total = ids.len();
                ids.sort_by_key(|id| (id.src.0, id.dest.0, id.seq));
                ids.dedup();
                prop_assert_eq!(ids.len(), total);
            }
        }
    }
}
