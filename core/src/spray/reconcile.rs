//! Anti-entropy reconciliation — summary-vector diff and spray eligibility
//!
//! On receipt of a neighbor's summary vector, the node computes which of its
//! cached messages the neighbor lacks and plans a unicast push. Two rules
//! shape the plan:
//!
//! - Forward eligibility: a record down to its last copy is withheld unless
//!   the neighbor IS the record's destination (the last copy is reserved for
//!   direct delivery).
//! - Spray halving: the copy field carried in the outgoing record is
//!   `max(1, copies / 2)`. The cached record is NOT mutated here; halving
//!   of the local budget is committed only when the push is acknowledged.

use super::store::MessageStore;
use super::wire::{MessageVector, NodeAddress, SummaryVector};

/// The copy budget carried by a forwarded record: integer halving,
/// floored, never below 1
pub fn spray_copies(copies: u8) -> u8 {
    (copies / 2).max(1)
}

/// Result of diffing the local store against a neighbor's advertisement
#[derive(Debug, Clone)]
pub struct PushPlan {
    /// Records the neighbor lacks, with halved outgoing copy budgets
    pub outgoing: MessageVector,
    /// Records withheld by the last-copy rule
    pub withheld: usize,
}

/// Diff the local store against a received summary vector and plan the push
/// to the advertising neighbor. Linear scan on both sides; each is bounded
/// by the vector capacity.
pub fn plan_push(store: &MessageStore, remote: &SummaryVector, neighbor: NodeAddress) -> PushPlan {
    let mut eligible = Vec::new();
    let mut withheld = 0;

    for record in store.iter() {
        if remote.contains(&record.id) {
            continue;
        }
        if record.copies == 1 && record.id.dest != neighbor {
            withheld += 1;
            continue;
        }
        let mut outgoing = record.clone();
        outgoing.copies = spray_copies(record.copies);
        eligible.push(outgoing);
    }

    PushPlan {
        outgoing: MessageVector::from_messages(eligible),
        withheld,
    }
}
