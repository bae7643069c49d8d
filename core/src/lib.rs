// Spraycast — spray-and-wait routing for disruption-tolerant sensor meshes
//
// "Will this message still get there when the network is mostly gaps?"
//
// Nodes cache a handful of messages, advertise what they hold, and hand
// copies to whoever they meet until the destination is one of them.

pub mod config;
pub mod spray;
pub mod transport;

pub use config::NodeConfig;
pub use spray::{
    plan_push, spray_copies, Delivery, MessageId, MessageStore, MessageVector, Neighbor,
    NeighborTable, Node, NodeAddress, NodeStats, Packet, PacketType, PushPlan, ReceiveOutcome,
    SprayError, SprayMessage, SummaryVector, MAX_MESSAGES, MAX_NEIGHBORS, MAX_PAYLOAD,
    MAX_VECTOR_ENTRIES, SPRAY_VERSION,
};
pub use transport::{RadioTransport, TransportError};
