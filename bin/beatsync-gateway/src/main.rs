//! BeatSync Gateway - beat metadata sync HTTP API
//!
//! Holds the process-wide ephemeral metadata store and serves the ingress,
//! egress, and discovery endpoints. Nothing is persisted: a restart loses
//! the cache and the next client sync pass repopulates it.

mod api;
mod error;

use anyhow::Result;
use api::AppState;
use beatsync_common::GatewayConfig;
use beatsync_store::MemoryStore;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "beatsync-gateway")]
#[command(about = "BeatSync beat metadata sync gateway")]
#[command(version)]
struct Args {
    /// Listen address for the HTTP API
    #[arg(short, long, default_value = "0.0.0.0:8780")]
    listen: String,

    /// Page size of the community discovery listing
    #[arg(long, default_value_t = beatsync_common::DISCOVERY_PAGE_SIZE)]
    page_size: usize,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let listen: SocketAddr = args
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", args.listen, e))?;
    let config = GatewayConfig {
        listen,
        page_size: args.page_size,
    };

    info!("Starting BeatSync Gateway");
    info!("Discovery page size: {}", config.page_size);

    let state = Arc::new(AppState {
        store: Arc::new(MemoryStore::new()),
        page_size: config.page_size,
    });

    let app = api::router(state).layer(TraceLayer::new_for_http());

    info!("Starting HTTP API server on {}", config.listen);
    let listener = TcpListener::bind(config.listen).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down...");
        })
        .await?;

    info!("Gateway shut down gracefully");

    Ok(())
}
