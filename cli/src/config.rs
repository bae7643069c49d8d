//! Config file handling for the CLI

use anyhow::{Context, Result};
use spraycast_core::{NodeAddress, NodeConfig};
use std::path::Path;

/// Load a JSON node config, creating the file with defaults on first use
pub fn load_or_create(path: &Path, address: NodeAddress) -> Result<NodeConfig> {
    if path.exists() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    } else {
        let config = NodeConfig::new(address);
        let text = serde_json::to_string_pretty(&config)?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(config)
    }
}
