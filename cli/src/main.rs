// spraycast — desktop harness for the spray-and-wait routing core
//
// Runs the protocol against an in-memory radio: an interactive node beside
// simulated peers, or a scripted multi-node exchange.

mod config;
mod harness;
mod sim;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use harness::Mesh;
use rand::Rng;
use spraycast_core::{NodeAddress, NodeConfig, ReceiveOutcome};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "spraycast")]
#[command(about = "Spray-and-Wait DTN routing harness", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive node beside simulated peers
    Run {
        /// Local radio address (hi.lo)
        #[arg(short, long, default_value = "128.1")]
        address: NodeAddress,
        /// Number of simulated peers sharing the broadcast domain
        #[arg(short, long, default_value = "2")]
        peers: u8,
        /// JSON config file (created with defaults if absent)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run a scripted multi-node exchange and print statistics
    Sim {
        #[arg(short, long, default_value = "4")]
        nodes: u8,
        #[arg(short, long, default_value = "20")]
        rounds: u32,
        /// RNG seed for reproducible runs
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            address,
            peers,
            config,
        } => run_interactive(address, peers, config).await,
        Commands::Sim {
            nodes,
            rounds,
            seed,
        } => sim::run(nodes, rounds, seed),
    }
}

async fn run_interactive(
    address: NodeAddress,
    peers: u8,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let node_config = match config_path {
        Some(path) => config::load_or_create(&path, address)?,
        None => NodeConfig::new(address),
    };

    let mut mesh = Mesh::new();
    mesh.add_node(node_config.clone());
    for i in 0..peers {
        let peer = NodeAddress::new(address.0[0], address.0[1].wrapping_add(i + 1));
        tracing::debug!(peer = %peer, "simulated peer added");
        mesh.add_node(NodeConfig::new(peer));
    }

    println!(
        "{}",
        format!("node {address} up with {peers} simulated peers").cyan()
    );
    println!("commands: inject <dest> <seq> [payload] | dump | peers | beacon | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let jitter_ms = rand::thread_rng().gen_range(0..=node_config.beacon_jitter_secs * 1000);
        let period =
            Duration::from_secs(node_config.beacon_interval_secs) + Duration::from_millis(jitter_ms);

        tokio::select! {
            _ = tokio::time::sleep(period) => {
                mesh.beacon_all();
                mesh.maintain();
                report_events(&mut mesh);
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(&mut mesh, line.trim())? {
                    break;
                }
                report_events(&mut mesh);
            }
        }
    }
    Ok(())
}

fn report_events(mesh: &mut Mesh) {
    for (to, outcome) in mesh.drain_events() {
        match outcome {
            ReceiveOutcome::Delivered { id } => {
                println!("{}", format!("{to} delivered {id}").green());
            }
            ReceiveOutcome::Stored { id, evicted } => {
                let mut line = format!("{to} cached {id}");
                if let Some(old) = evicted {
                    line.push_str(&format!(" (evicted {old})"));
                }
                println!("{}", line.dimmed());
            }
            ReceiveOutcome::Duplicate { .. } => {}
        }
    }
}

/// Returns false when the session should end
fn handle_command(mesh: &mut Mesh, line: &str) -> Result<bool> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        None => Ok(true),
        Some("inject") => {
            let dest: NodeAddress = parts
                .next()
                .context("usage: inject <dest> <seq> [payload]")?
                .parse()
                .map_err(anyhow::Error::msg)?;
            let seq: u8 = parts
                .next()
                .context("usage: inject <dest> <seq> [payload]")?
                .parse()?;
            let payload = parts.next().unwrap_or("ping");
            match mesh.local_mut().inject(dest, seq, payload.as_bytes()) {
                Ok(true) => println!("{}", format!("injected ->{dest} #{seq}").green()),
                Ok(false) => println!("{}", "already cached".yellow()),
                Err(e) => println!("{}", format!("inject failed: {e}").red()),
            }
            Ok(true)
        }
        Some("dump") => {
            println!("{}", mesh.local().dump());
            Ok(true)
        }
        Some("peers") => {
            for node in mesh.nodes() {
                let stats = node.stats();
                println!(
                    "  {} store={} delivered={} pushes={}",
                    node.local_address().to_string().bold(),
                    node.store().len(),
                    stats.deliveries_received,
                    stats.pushes_sent,
                );
            }
            Ok(true)
        }
        Some("beacon") => {
            mesh.beacon_all();
            Ok(true)
        }
        Some("quit") | Some("exit") => Ok(false),
        Some(other) => {
            println!("{}", format!("unknown command: {other}").yellow());
            Ok(true)
        }
    }
}
