//! X-Ray propagation demo service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request (x-amzn-trace-id?)
//!     ─────────────────────────────────▶ ┌──────────────────────┐
//!                                        │  segment middleware  │──▶ Recorder ──▶ Emitter
//!                                        │  (begin / continue)  │        ▲
//!                                        └──────────┬───────────┘        │
//!                                                   ▼                    │
//!                                        ┌──────────────────────┐        │
//!                                        │       handler        │── subsegment
//!                                        │  /  /status  /down.. │──▶ Downstream (Root;Parent;Sampled)
//!                                        └──────────┬───────────┘
//!     Client Response (Root=..;Sampled=..)          │
//!     ◀─────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use xray_propagation::config::{load_config, ServiceConfig};
use xray_propagation::lifecycle::{wait_for_signal, Shutdown};
use xray_propagation::observability::{logging, metrics};
use xray_propagation::HttpServer;

#[derive(Parser)]
#[command(name = "xray-propagation")]
#[command(about = "HTTP service that records and propagates X-Ray traces", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("xray-propagation v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        emitter = ?config.recorder.emitter,
        downstream = ?config.downstream.url,
        request_timeout_secs = config.timeouts.request_secs,
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
