//! Fleet Gateway
//!
//! An API gateway for fleet-management services built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │                FLEET GATEWAY                  │
//!   Client Request      │  ┌──────┐   ┌─────────┐   ┌──────────────┐  │
//!   ────────────────────┼─▶│ http │──▶│ proxy   │──▶│ resilience   │──┼──▶ vehicle /
//!                       │  │server│   │registry │   │ breaker +    │  │    maintenance /
//!   Client Response     │  └──────┘   │rewrite  │   │ dispatcher   │  │    analytics /
//!   ◀───────────────────┼─────────────┴─────────┴───┴──────┬───────┘  │    tracking
//!                       │                                  │          │
//!                       │  ┌────────────────────────────────────────┐ │
//!                       │  │          Cross-Cutting Concerns         │ │
//!                       │  │  config   health monitor   lifecycle    │ │
//!                       │  │        observability (logs+metrics)     │ │
//!                       │  └────────────────────────────────────────┘ │
//!                       └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use fleet_gateway::config::{load_config, GatewayConfig};
use fleet_gateway::lifecycle::Shutdown;
use fleet_gateway::observability::{logging, metrics};
use fleet_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "fleet-gateway")]
#[command(about = "API gateway for fleet-management services", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Configuration errors prevent startup rather than being handled per-request.
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        health_check = config.health_check.enabled,
        "configuration loaded"
    );
    if config.services.is_empty() {
        tracing::warn!("no services configured; every request will return 404");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let _ = shutdown.trigger_on_ctrl_c();

    let server = GatewayServer::new(config);
    server.run(listener, shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
