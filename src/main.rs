//! Tool RPC Server
//!
//! Serves the built-in tools over stdio (default) or a WebSocket listener.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use tool_rpc_server::config::Config;
use tool_rpc_server::error::Result;
use tool_rpc_server::mcp::builtin::default_registry;
use tool_rpc_server::mcp::Dispatcher;
use tool_rpc_server::transport::{stdio, ws};

/// Tool RPC Server
#[derive(Parser)]
#[command(name = "tool-rpc-server")]
#[command(
    author,
    version,
    about = "Tool RPC Server - JSON-RPC tool dispatcher over stdio or WebSocket"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve newline-delimited JSON on stdin/stdout (default)
    Stdio,

    /// Serve over WebSocket
    Ws {
        /// Host to bind (overrides TOOL_RPC_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides TOOL_RPC_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is reserved for protocol replies
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    let registry = Arc::new(default_registry());
    let dispatcher = Dispatcher::with_server_name(registry, config.server_name.clone());

    match cli.command {
        Some(Commands::Ws { host, port }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            ws::serve_ws(dispatcher, config.bind_addr()?).await?;
        }
        Some(Commands::Stdio) | None => {
            stdio::run_stdio(dispatcher).await?;
        }
    }

    Ok(())
}
