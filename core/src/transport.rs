//! Radio substrate boundary
//!
//! The core never talks to a radio directly: it issues sends through this
//! trait and is driven back through the `Node::on_*` callbacks. The link
//! layer owns retransmission and acknowledgment; completion of a unicast
//! comes back later as a discrete ack or timeout event, never inline.

use crate::spray::wire::NodeAddress;
use thiserror::Error;

/// Errors surfaced by a transport implementation
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("Radio is mid-transmission")]
    Busy,

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// The broadcast + acknowledged-unicast primitives the protocol runs over.
///
/// `unicast_send` only queues the transmission; the outcome arrives later
/// via `Node::on_unicast_acked` or `Node::on_unicast_timedout`. At most one
/// unicast is in flight per node; callers gate on `is_transmitting`.
pub trait RadioTransport {
    /// Fire-and-forget local broadcast
    fn broadcast_send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Acknowledged unicast with a link-layer retransmission budget
    fn unicast_send(
        &mut self,
        dest: NodeAddress,
        payload: &[u8],
        max_retransmissions: u8,
    ) -> Result<(), TransportError>;

    /// True while a transmission is in progress
    fn is_transmitting(&self) -> bool;
}
