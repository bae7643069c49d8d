//! Node configuration

use crate::spray::wire::NodeAddress;
use serde::{Deserialize, Serialize};

/// Configuration for a spray node (all tunable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's radio address; final-destination checks compare against it
    pub local_address: NodeAddress,
    /// Spray budget assigned to locally injected messages (clamped >= 1)
    pub initial_copies: u8,
    /// Retransmission budget handed to the link layer per unicast
    pub max_retransmissions: u8,
    /// Base beacon period in seconds
    pub beacon_interval_secs: u64,
    /// Random extra delay added to each beacon period
    pub beacon_jitter_secs: u64,
    /// Neighbors silent for longer than this are pruned
    pub neighbor_expiry_secs: u32,
}

impl NodeConfig {
    pub fn new(local_address: NodeAddress) -> Self {
        Self {
            local_address,
            ..Self::default()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            local_address: NodeAddress::new(128, 1),
            initial_copies: 8,
            max_retransmissions: 4,
            beacon_interval_secs: 3,
            beacon_jitter_secs: 3,
            neighbor_expiry_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.initial_copies, 8);
        assert_eq!(config.max_retransmissions, 4);
        assert_eq!(config.neighbor_expiry_secs, 10);
    }

    #[test]
    fn test_new_overrides_address_only() {
        let config = NodeConfig::new(NodeAddress::new(128, 9));
        assert_eq!(config.local_address, NodeAddress::new(128, 9));
        assert_eq!(config.initial_copies, NodeConfig::default().initial_copies);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = NodeConfig::new(NodeAddress::new(128, 9));
        let json = serde_json::to_string(&config).unwrap();
        let restored: NodeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.local_address, config.local_address);
        assert_eq!(restored.beacon_interval_secs, config.beacon_interval_secs);
    }
}
