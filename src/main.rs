//! Chat Gateway
//!
//! HTTP entry point for the chat application, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────────┐
//!                     │                        GATEWAY                            │
//!   Client Request    │  ┌────────┐   ┌─────────┐   ┌──────┐   ┌────────┐          │
//!   ──────────────────┼─▶│ origin │──▶│ session │──▶│ body │──▶│ logger │          │
//!                     │  │ policy │   │ manager │   │decode│   └───┬────┘          │
//!                     │  └───┬────┘   └────┬────┘   └──────┘       │               │
//!                     │      │ OPTIONS     │                       ▼               │
//!                     │      ▼ 204         ▼               ┌──────────────┐        │
//!   ◀─────────────────┼──────┘      ┌─────────────┐        │  dispatcher  │        │
//!                     │             │session store│        │  → features  │        │
//!                     │             │memory/sqlite│        │  → statics   │        │
//!                     │             └─────────────┘        │  → 404       │        │
//!                     │                                    └──────────────┘        │
//!                     │  ┌──────────────────────────────────────────────────────┐  │
//!                     │  │ config · lifecycle · observability · resilience       │  │
//!                     │  └──────────────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use chat_gateway::config;
use chat_gateway::lifecycle::Gateway;
use chat_gateway::observability::{logging, metrics};
use chat_gateway::routing::Collaborators;

#[derive(Parser)]
#[command(name = "chat-gateway")]
#[command(about = "HTTP entry point for the chat application", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "chat-gateway starting");

    if config.session.secret.is_empty() {
        tracing::warn!("SESSION_SECRET not set, signing cookies with the development secret");
    }

    tracing::info!(
        bind_address = %config.server.bind_address(),
        production = config.server.production,
        trust_proxy = config.server.trust_proxy(),
        session_store = ?config.store.backend,
        public_dir = %config.server.public_dir,
        "Configuration loaded"
    );

    if cli.check {
        println!("configuration OK");
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    Gateway::new(config, Collaborators::builtin()).run().await?;
    Ok(())
}
