//! The per-node protocol state machine
//!
//! A `Node` owns the message store, the neighbor table, and the transport
//! handle, and is driven entirely by discrete events: radio receive
//! callbacks, send-completion callbacks, and periodic timers. Handlers run
//! to completion with no preemption; the dispatcher that invokes them must
//! not re-enter (a multi-threaded host wraps the node in its own lock or a
//! single worker task).
//!
//! Event surface:
//! - `on_beacon_timer` — advertise the cached identities by broadcast
//! - `on_broadcast_received` — reconcile against a neighbor's advertisement
//!   and push what it lacks via acknowledged unicast
//! - `on_unicast_received` — consume records addressed here, cache the rest
//! - `on_unicast_acked` / `on_unicast_timedout` — commit or discard the
//!   in-flight push
//! - `on_maintenance_timer` — prune silent neighbors

use super::neighbors::NeighborTable;
use super::reconcile::{plan_push, spray_copies};
use super::store::MessageStore;
use super::wire::{MessageId, NodeAddress, Packet, SprayMessage, MAX_VECTOR_ENTRIES};
use crate::config::NodeConfig;
use crate::transport::{RadioTransport, TransportError};
use std::collections::VecDeque;
use std::fmt::Write as _;
use tracing::{debug, info, warn};

/// Delivered messages kept for inspection
const INBOX_CAPACITY: usize = 16;

/// A message consumed at its final destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub id: MessageId,
    /// The neighbor that relayed the final hop
    pub from: NodeAddress,
    /// Creation timestamp carried by the record
    pub timestamp: u32,
    pub payload: Vec<u8>,
}

/// Outcome of processing one inbound pushed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Addressed to this node: consumed, never cached
    Delivered { id: MessageId },
    /// Cached for relay; `evicted` names the record dropped to make room
    Stored {
        id: MessageId,
        evicted: Option<MessageId>,
    },
    /// Already cached, discarded
    Duplicate { id: MessageId },
}

/// Diagnostic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub beacons_sent: u64,
    pub beacons_skipped: u64,
    pub summaries_received: u64,
    pub pushes_sent: u64,
    pub pushes_skipped_busy: u64,
    pub records_stored: u64,
    pub duplicates_discarded: u64,
    pub deliveries_received: u64,
    pub deliveries_confirmed: u64,
    pub acks: u64,
    pub send_timeouts: u64,
    pub evictions: u64,
    pub malformed_dropped: u64,
    pub neighbors_pruned: u64,
}

/// The unicast push awaiting link-layer completion. At most one exists;
/// its identities are the only records an ack may mutate.
#[derive(Debug, Clone)]
struct PendingPush {
    dest: NodeAddress,
    ids: Vec<MessageId>,
}

/// A spray-and-wait routing node
pub struct Node<T: RadioTransport> {
    config: NodeConfig,
    store: MessageStore,
    neighbors: NeighborTable,
    transport: T,
    in_flight: Option<PendingPush>,
    inbox: VecDeque<Delivery>,
    stats: NodeStats,
}

impl<T: RadioTransport> Node<T> {
    pub fn new(mut config: NodeConfig, transport: T) -> Self {
        config.initial_copies = config.initial_copies.max(1);
        Self {
            config,
            store: MessageStore::new(),
            neighbors: NeighborTable::new(),
            transport,
            in_flight: None,
            inbox: VecDeque::new(),
            stats: NodeStats::default(),
        }
    }

    pub fn local_address(&self) -> NodeAddress {
        self.config.local_address
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Delivered messages, oldest first
    pub fn inbox(&self) -> impl Iterator<Item = &Delivery> {
        self.inbox.iter()
    }

    /// Periodic advertisement: broadcast the store's summary vector.
    /// Sent even when the store is empty, so neighbors learn we exist.
    pub fn on_beacon_timer(&mut self) {
        let bytes = self.store.summary().encode();
        match self.transport.broadcast_send(&bytes) {
            Ok(()) => {
                self.stats.beacons_sent += 1;
                debug!(entries = self.store.len(), "beacon sent");
            }
            Err(TransportError::Busy) => {
                self.stats.beacons_skipped += 1;
                debug!("beacon skipped: radio busy");
            }
            Err(e) => {
                self.stats.beacons_skipped += 1;
                warn!(error = %e, "beacon send failed");
            }
        }
    }

    /// Reconcile against a neighbor's summary vector and push what it
    /// lacks. A busy radio or an outstanding push skips the cycle; the
    /// next beacon retries naturally.
    pub fn on_broadcast_received(&mut self, from: NodeAddress, bytes: &[u8]) {
        let summary = match Packet::decode(bytes) {
            Ok(Packet::Summary(summary)) => summary,
            Ok(other) => {
                debug!(from = %from, packet = ?other, "ignoring non-summary broadcast");
                return;
            }
            Err(e) => {
                self.stats.malformed_dropped += 1;
                warn!(from = %from, error = %e, "dropping malformed broadcast");
                return;
            }
        };

        self.stats.summaries_received += 1;
        debug!(from = %from, entries = summary.len(), "summary vector received");

        let plan = plan_push(&self.store, &summary, from);
        if !self.neighbors.observe(from, summary, unix_now()) {
            warn!(from = %from, "neighbor table full, not tracking");
        }

        if plan.withheld > 0 {
            debug!(from = %from, withheld = plan.withheld, "last copies reserved for destination");
        }
        if plan.outgoing.is_empty() {
            return;
        }
        if self.transport.is_transmitting() || self.in_flight.is_some() {
            self.stats.pushes_skipped_busy += 1;
            debug!(from = %from, "push skipped: transmission in progress");
            return;
        }

        let bytes = plan.outgoing.encode();
        match self
            .transport
            .unicast_send(from, &bytes, self.config.max_retransmissions)
        {
            Ok(()) => {
                self.in_flight = Some(PendingPush {
                    dest: from,
                    ids: plan.outgoing.ids(),
                });
                self.stats.pushes_sent += 1;
                info!(to = %from, records = plan.outgoing.len(), "pushing records");
            }
            Err(TransportError::Busy) => {
                self.stats.pushes_skipped_busy += 1;
                debug!(to = %from, "push skipped: radio busy");
            }
            Err(e) => {
                warn!(to = %from, error = %e, "push send failed");
            }
        }
    }

    /// Process a pushed message vector: consume records addressed to this
    /// node, cache the rest (duplicates discarded). Copy budgets arrive
    /// already halved by the sender.
    pub fn on_unicast_received(
        &mut self,
        from: NodeAddress,
        seq: u8,
        bytes: &[u8],
    ) -> Vec<ReceiveOutcome> {
        let vector = match Packet::decode(bytes) {
            Ok(Packet::Messages(vector)) => vector,
            Ok(other) => {
                debug!(from = %from, seq, packet = ?other, "ignoring non-message unicast");
                return Vec::new();
            }
            Err(e) => {
                self.stats.malformed_dropped += 1;
                warn!(from = %from, seq, error = %e, "dropping malformed unicast");
                return Vec::new();
            }
        };

        let mut outcomes = Vec::with_capacity(vector.len());
        for record in vector.into_messages() {
            let id = record.id;
            if id.dest == self.config.local_address {
                self.stats.deliveries_received += 1;
                info!(id = %id, from = %from, timestamp = record.timestamp, "message delivered");
                if self.inbox.len() >= INBOX_CAPACITY {
                    self.inbox.pop_front();
                }
                self.inbox.push_back(Delivery {
                    id,
                    from,
                    timestamp: record.timestamp,
                    payload: record.payload().to_vec(),
                });
                outcomes.push(ReceiveOutcome::Delivered { id });
            } else if self.store.contains(&id) {
                self.stats.duplicates_discarded += 1;
                debug!(id = %id, "duplicate record discarded");
                outcomes.push(ReceiveOutcome::Duplicate { id });
            } else {
                let evicted = self.store.insert_with_eviction(record).map(|m| m.id);
                if let Some(old) = evicted {
                    self.stats.evictions += 1;
                    debug!(evicted = %old, "cache full, oldest record dropped");
                }
                self.stats.records_stored += 1;
                debug!(id = %id, "record cached for relay");
                outcomes.push(ReceiveOutcome::Stored { id, evicted });
            }
        }
        outcomes
    }

    /// Commit the in-flight push: records that reached their destination
    /// are removed, the rest have their local copy budget halved. Only the
    /// just-pushed batch is touched, matched by identity.
    pub fn on_unicast_acked(&mut self, to: NodeAddress, retransmissions: u8) {
        let Some(push) = self.in_flight.take() else {
            warn!(to = %to, "ack with no push in flight");
            return;
        };
        if push.dest != to {
            warn!(to = %to, expected = %push.dest, "ack from unexpected neighbor");
            return;
        }

        self.stats.acks += 1;
        debug!(to = %to, retransmissions, "push acknowledged");

        for id in push.ids {
            if id.dest == to {
                if self.store.remove(&id).is_some() {
                    self.stats.deliveries_confirmed += 1;
                    info!(id = %id, "delivered to destination, record retired");
                }
            } else if let Some(record) = self.store.get_mut(&id) {
                record.copies = spray_copies(record.copies);
                debug!(id = %id, copies = record.copies, "copy budget halved");
            }
        }
    }

    /// The push failed transiently: no store mutation, no scheduled retry.
    /// The next reconciliation cycle retries naturally.
    pub fn on_unicast_timedout(&mut self, to: NodeAddress, retransmissions: u8) {
        self.stats.send_timeouts += 1;
        warn!(to = %to, retransmissions, "push timed out");
        if let Some(push) = self.in_flight.take() {
            if push.dest != to {
                warn!(to = %to, expected = %push.dest, "timeout from unexpected neighbor");
            }
        }
    }

    /// Prune neighbors silent for longer than the configured expiry
    pub fn on_maintenance_timer(&mut self) {
        let pruned = self
            .neighbors
            .prune_stale(unix_now(), self.config.neighbor_expiry_secs);
        if pruned > 0 {
            self.stats.neighbors_pruned += pruned as u64;
            debug!(pruned, "stale neighbors removed");
        }
    }

    /// Inject a locally sourced message (test/application stimulus).
    /// Returns false if the identity is already cached.
    pub fn inject(
        &mut self,
        dest: NodeAddress,
        seq: u8,
        payload: &[u8],
    ) -> Result<bool, super::SprayError> {
        let id = MessageId::new(self.config.local_address, dest, seq);
        let record = SprayMessage::new(id, unix_now(), self.config.initial_copies, payload)?;
        if self.store.contains(&id) {
            debug!(id = %id, "inject skipped: already cached");
            return Ok(false);
        }
        if let Some(old) = self.store.insert_with_eviction(record) {
            self.stats.evictions += 1;
            debug!(evicted = %old.id, "cache full, oldest record dropped");
        }
        info!(id = %id, copies = self.config.initial_copies, "message injected");
        Ok(true)
    }

    /// Human-readable dump of the store, neighbor table, and inbox
    pub fn dump(&self) -> String {
        let now = unix_now();
        let mut out = String::new();
        let _ = writeln!(out, "node {}", self.config.local_address);

        let _ = writeln!(out, "store ({}/{}):", self.store.len(), MAX_VECTOR_ENTRIES);
        for record in self.store.iter() {
            let _ = writeln!(
                out,
                "  {} copies={} age={}s payload={:?}",
                record.id,
                record.copies,
                now.saturating_sub(record.timestamp),
                String::from_utf8_lossy(record.payload()),
            );
        }

        let _ = writeln!(out, "neighbors ({}):", self.neighbors.len());
        for neighbor in self.neighbors.iter() {
            let _ = writeln!(
                out,
                "  {} heard {}s ago, advertising {} ids",
                neighbor.addr,
                now.saturating_sub(neighbor.last_seen),
                neighbor.summary.len(),
            );
        }

        let _ = writeln!(out, "inbox ({}):", self.inbox.len());
        for delivery in &self.inbox {
            let _ = writeln!(
                out,
                "  {} via {} payload={:?}",
                delivery.id,
                delivery.from,
                String::from_utf8_lossy(&delivery.payload),
            );
        }

        let _ = write!(
            out,
            "stats: beacons={} summaries={} pushes={} skipped={} stored={} dup={} \
             delivered={} confirmed={} acks={} timeouts={} evictions={} malformed={}",
            self.stats.beacons_sent,
            self.stats.summaries_received,
            self.stats.pushes_sent,
            self.stats.pushes_skipped_busy,
            self.stats.records_stored,
            self.stats.duplicates_discarded,
            self.stats.deliveries_received,
            self.stats.deliveries_confirmed,
            self.stats.acks,
            self.stats.send_timeouts,
            self.stats.evictions,
            self.stats.malformed_dropped,
        );
        out
    }
}

fn unix_now() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32
}
