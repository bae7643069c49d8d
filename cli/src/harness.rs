//! In-memory mesh — one broadcast domain with loss-free acknowledged unicast
//!
//! The desktop stand-in for the radio: queued sends are delivered and acked
//! synchronously by `pump`, one handler at a time, so the core's
//! run-to-completion contract holds without any real radio underneath.

use spraycast_core::{
    Node, NodeAddress, NodeConfig, RadioTransport, ReceiveOutcome, TransportError,
};

enum RadioOp {
    Broadcast(Vec<u8>),
    Unicast { dest: NodeAddress, payload: Vec<u8> },
}

/// Queues sends for the mesh to deliver
#[derive(Default)]
pub struct QueueRadio {
    outbox: Vec<RadioOp>,
}

impl RadioTransport for QueueRadio {
    fn broadcast_send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.outbox.push(RadioOp::Broadcast(payload.to_vec()));
        Ok(())
    }

    fn unicast_send(
        &mut self,
        dest: NodeAddress,
        payload: &[u8],
        _max_retransmissions: u8,
    ) -> Result<(), TransportError> {
        self.outbox.push(RadioOp::Unicast {
            dest,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn is_transmitting(&self) -> bool {
        false
    }
}

/// A set of nodes sharing one broadcast domain
pub struct Mesh {
    nodes: Vec<Node<QueueRadio>>,
    events: Vec<(NodeAddress, ReceiveOutcome)>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn add_node(&mut self, config: NodeConfig) {
        self.nodes.push(Node::new(config, QueueRadio::default()));
    }

    pub fn nodes(&self) -> &[Node<QueueRadio>] {
        &self.nodes
    }

    /// The interactive node is always the first one added
    pub fn local(&self) -> &Node<QueueRadio> {
        &self.nodes[0]
    }

    pub fn local_mut(&mut self) -> &mut Node<QueueRadio> {
        &mut self.nodes[0]
    }

    pub fn node_at_mut(&mut self, index: usize) -> &mut Node<QueueRadio> {
        &mut self.nodes[index]
    }

    /// Beacon from one node, then deliver queued traffic until quiet
    pub fn beacon_index(&mut self, index: usize) {
        self.nodes[index].on_beacon_timer();
        self.pump();
    }

    /// One beacon round across the whole mesh
    pub fn beacon_all(&mut self) {
        for i in 0..self.nodes.len() {
            self.beacon_index(i);
        }
    }

    /// Run every node's maintenance tick
    pub fn maintain(&mut self) {
        for node in &mut self.nodes {
            node.on_maintenance_timer();
        }
    }

    /// Receive outcomes accumulated since the last drain, tagged with the
    /// receiving node's address
    pub fn drain_events(&mut self) -> Vec<(NodeAddress, ReceiveOutcome)> {
        std::mem::take(&mut self.events)
    }

    fn pump(&mut self) {
        loop {
            let mut progressed = false;
            for i in 0..self.nodes.len() {
                let from = self.nodes[i].local_address();
                let ops = std::mem::take(&mut self.nodes[i].transport_mut().outbox);
                for op in ops {
                    progressed = true;
                    match op {
                        RadioOp::Broadcast(bytes) => {
                            for j in 0..self.nodes.len() {
                                if j != i {
                                    self.nodes[j].on_broadcast_received(from, &bytes);
                                }
                            }
                        }
                        RadioOp::Unicast { dest, payload } => {
                            match self.nodes.iter().position(|n| n.local_address() == dest) {
                                Some(j) => {
                                    let outcomes =
                                        self.nodes[j].on_unicast_received(from, 0, &payload);
                                    self.events
                                        .extend(outcomes.into_iter().map(|o| (dest, o)));
                                    self.nodes[i].on_unicast_acked(dest, 0);
                                }
                                None => {
                                    self.nodes[i].on_unicast_timedout(dest, 4);
                                }
                            }
                        }
                    }
                }
            }
            if !progressed {
                break;
            }
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
