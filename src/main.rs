//! Retrying reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                RETRY PROXY                    │
//!   Client Request        │  ┌────────┐   ┌───────────┐   ┌───────────┐  │
//!   ──────────────────────┼─▶│ axum   │──▶│  retry    │──▶│ forwarder │──┼──▶ Backend
//!                         │  │ server │   │ controller│   │ (hyper)   │  │
//!                         │  └────────┘   └─────┬─────┘   └─────┬─────┘  │
//!                         │                     │ attempt N     │        │
//!                         │                     ▼               │        │
//!                         │               ┌───────────┐         │        │
//!   Client Response       │               │ recorder  │◀────────┘        │
//!   ◀─────────────────────┼───────────────│ (replay)  │                  │
//!                         │               └───────────┘                  │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use lazy_retry_proxy::config::{load_config, ProxyConfig};
use lazy_retry_proxy::observability::{logging, metrics};
use lazy_retry_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "lazy-retry-proxy")]
#[command(about = "Reverse proxy that retries failed upstream responses", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the upstream backend address.
    #[arg(short, long)]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream.address = upstream;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("lazy-retry-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        max_attempts = config.retry.max_attempts,
        retry_delay = ?config.retry.retry_delay,
        retry_status_codes = ?config.retry.retry_status_codes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Validates the whole config, overrides included, before binding.
    let server = HttpServer::new(config.clone())?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
