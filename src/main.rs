//! # mcp-unreal
//!
//! MCP (Model Context Protocol) server that drives a running Unreal Editor.
//! Runs as a stdio JSON-RPC server, launched by an AI agent host.
//!
//! ## Architecture
//!
//! ```text
//! main.rs            entry point, config loading, logging, MCP server launch
//! config.rs          CLI / env-var / JSON file configuration
//! protocol.rs        result envelope and wire types
//! socket.rs          TCP client for the editor command socket
//! remote_control.rs  Web Remote Control HTTP client with port fallback
//! script.rs          Python scripts run through Web Remote Control
//! router.rs          command routing, socket first then HTTP
//! tools.rs           tool registry, definitions and handlers
//! mcp.rs             MCP JSON-RPC protocol handler (stdio)
//! ```
//!
//! The editor is reached over its TCP command socket when the command
//! plugin is loaded, and over Web Remote Control otherwise.

mod config;
mod mcp;
mod protocol;
mod remote_control;
mod router;
mod script;
mod socket;
mod tools;

#[cfg(test)]
mod test_support;

use clap::Parser;
use config::Cli;
use router::UnrealClient;
use tools::ToolRegistry;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let resolved = match config::load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mcp-unreal: configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| resolved.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let client_config = &resolved.client;
    tracing::info!(
        host = %client_config.host,
        tcp_port = client_config.tcp_port,
        http_port = client_config.http_port,
        fallback_ports = ?client_config.fallback_ports,
        "mcp-unreal {} starting",
        env!("CARGO_PKG_VERSION")
    );

    let client = UnrealClient::from_config(client_config);
    mcp::run_stdio(ToolRegistry::builtin(), client).await;
}
