use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use godot_mcp::config::{Config, CONFIG_FILE};
use godot_mcp::logging;
use godot_mcp::server::{self, BridgeServer};

/// MCP server bridging LLM clients to a running Godot editor and game.
#[derive(Debug, Parser)]
#[command(name = "godot-mcp", version, about)]
struct Args {
    /// Port for the MCP HTTP server
    #[arg(long, default_value_t = server::DEFAULT_PORT)]
    port: u16,

    /// Path to the port override file (default: ./mcp_ports.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for JSONL logs (default: ~/.godot-mcp/logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = logging::init(args.log_dir.clone());

    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = Config::load(&config_path);

    let state_dir = dirs::home_dir()
        .context("Failed to get home directory")?
        .join(".godot-mcp");

    let server = BridgeServer::new(args.port, state_dir, config)?;
    info!(url = %server.url(), "Starting MCP server");

    let handle = server.start()?;
    handle.join();
    Ok(())
}
