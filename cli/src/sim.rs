//! Scripted multi-node exchange with sporadic encounters
//!
//! Every round injects traffic at random sources and lets a random subset
//! of nodes beacon, the way real contacts come and go. Prints per-node
//! statistics when the run ends.

use crate::harness::Mesh;
use anyhow::Result;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spraycast_core::{NodeAddress, NodeConfig};

pub fn run(nodes: u8, rounds: u32, seed: Option<u64>) -> Result<()> {
    let nodes = nodes.max(2);
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut mesh = Mesh::new();
    for i in 0..nodes {
        mesh.add_node(NodeConfig::new(NodeAddress::new(128, i + 1)));
    }

    println!(
        "{}",
        format!("simulating {nodes} nodes over {rounds} rounds").cyan()
    );

    let mut seq: u8 = 0;
    let mut injected: u32 = 0;
    for _ in 0..rounds {
        if rng.gen_bool(0.5) {
            let src = rng.gen_range(0..nodes) as usize;
            let mut dst = rng.gen_range(0..nodes) as usize;
            while dst == src {
                dst = rng.gen_range(0..nodes) as usize;
            }
            seq = seq.wrapping_add(1);
            let dest = NodeAddress::new(128, dst as u8 + 1);
            if mesh.node_at_mut(src).inject(dest, seq, b"sim")? {
                injected += 1;
            }
        }

        // sporadic encounters: each node beacons with 70% probability
        for i in 0..nodes as usize {
            if rng.gen_bool(0.7) {
                mesh.beacon_index(i);
            }
        }
        mesh.maintain();
    }

    let delivered: u64 = mesh
        .nodes()
        .iter()
        .map(|n| n.stats().deliveries_received)
        .sum();

    println!("{}", format!("injected {injected}, delivered {delivered}").green());
    for node in mesh.nodes() {
        let stats = node.stats();
        println!(
            "  {} store={} beacons={} pushes={} delivered={} evictions={} timeouts={}",
            node.local_address().to_string().bold(),
            node.store().len(),
            stats.beacons_sent,
            stats.pushes_sent,
            stats.deliveries_received,
            stats.evictions,
            stats.send_timeouts,
        );
    }
    Ok(())
}
