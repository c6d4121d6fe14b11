//! Vote-integrity server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http (axum + tower layers) ──▶ pipeline
//!                                                  │
//!           ┌──────────────┬──────────────┬────────┴─────┬──────────────┐
//!           ▼              ▼              ▼              ▼              ▼
//!       sessions        ledger       rate limiter   verification     audit
//!           │              │              │           gate              │
//!           └──────┬───────┘              ▼              ▼              │
//!                  ▼                counter store    reCAPTCHA         │
//!             record store ◀────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;

use vote_guard::config::{load_config, load_from_env};
use vote_guard::http::HttpServer;
use vote_guard::lifecycle::{build_runtime, wait_for_signal, MaintenanceTask, Shutdown};
use vote_guard::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "vote-server")]
#[command(about = "Vote-integrity API server", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults plus environment when omitted.
    #[arg(short, long, env = "VOTE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vote-server starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        contestants = ?config.contest.allowed_list(),
        max_votes_per_device = config.security.max_votes_per_device,
        max_votes_per_ip = config.security.max_votes_per_ip,
        token_expiry_minutes = config.security.token_expiry_minutes,
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

    let runtime = build_runtime(&config)?;
    let shutdown = Shutdown::new();

    let maintenance = MaintenanceTask::new(
        runtime.store.clone(),
        runtime.pipeline.rate_limiter().clone(),
        Duration::from_secs(config.storage.flush_interval_secs),
    );
    let maintenance_handle = tokio::spawn(maintenance.run(shutdown.subscribe()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, runtime.pipeline.clone());
    let server_handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    tracing::info!("Shutdown signal received, draining");
    shutdown.trigger();

    server_handle.await??;
    maintenance_handle.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
