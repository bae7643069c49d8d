//! Spray-and-Wait routing protocol — cache, codecs, and exchange logic
//!
//! This module provides:
//! - Wire codecs: explicit byte-level encoding for summary vectors and
//!   message vectors carried by the radio substrate
//! - MessageStore: fixed-capacity FIFO cache of in-flight messages
//! - NeighborTable: bounded table of recently heard neighbors
//! - Anti-entropy reconciliation: summary-vector diff + spray eligibility
//! - Node: the per-process protocol state machine driven by radio callbacks
//!
//! Protocol flow:
//! 1. A periodic beacon broadcasts a summary vector of cached message ids
//! 2. A neighbor diffs the vector against its own cache and pushes what the
//!    beaconing node lacks via acknowledged unicast
//! 3. Each acknowledged push halves the sender's remaining copy budget; the
//!    last copy is reserved for direct delivery to the destination
//! 4. A push addressed to the local node is consumed, never re-cached

pub mod neighbors;
pub mod node;
pub mod reconcile;
pub mod store;
pub mod wire;

pub use neighbors::{Neighbor, NeighborTable, MAX_NEIGHBORS};
pub use node::{Delivery, Node, NodeStats, ReceiveOutcome};
pub use reconcile::{plan_push, spray_copies, PushPlan};
pub use store::{MessageStore, MAX_MESSAGES};
pub use wire::{
    MessageId, MessageVector, NodeAddress, Packet, PacketType, SprayMessage, SummaryVector,
    MAX_PAYLOAD, MAX_VECTOR_ENTRIES,
};

use thiserror::Error;

/// Spray protocol errors
#[derive(Debug, Error, Clone)]
pub enum SprayError {
    #[error("Buffer too short: need {need} bytes, got {got}")]
    BufferTooShort { need: usize, got: usize },

    #[error("Invalid protocol version: {0}")]
    InvalidVersion(u8),

    #[error("Packet length mismatch: expected {expected} bytes, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("Entry count {0} exceeds vector capacity of {MAX_VECTOR_ENTRIES}")]
    EntryCountTooLarge(u8),

    #[error("Unexpected packet type: {0}")]
    UnexpectedPacketType(u8),

    #[error("Payload too large: {0} bytes (max {MAX_PAYLOAD})")]
    PayloadTooLarge(usize),
}

/// Current spray protocol version (3-bit wire field)
pub const SPRAY_VERSION: u8 = 0x01;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spray_version_fits_wire_field() {
        assert!(SPRAY_VERSION <= 0x07);
    }
}
