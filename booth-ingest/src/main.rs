//! booth-ingest - Main entry point
//!
//! Serves the hub WebSocket and group API, and runs the landing zone watcher
//! until Ctrl+C or SIGTERM.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booth_ingest::config::{IngestConfig, Overrides};
use booth_ingest::groups::GroupStore;
use booth_ingest::hub::Hub;
use booth_ingest::register::RegisterHandle;
use booth_ingest::relocate::Relocator;
use booth_ingest::watcher::IngestWatcher;
use booth_ingest::watermark::Watermarker;
use booth_ingest::{build_router, AppState};

/// How long shutdown waits for in-flight relocations
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Command-line arguments for booth-ingest
#[derive(Parser, Debug)]
#[command(name = "booth-ingest")]
#[command(about = "Live capture ingestion service for the event photo booth")]
#[command(version)]
struct Args {
    /// Address to listen on for the HTTP API and hub
    #[arg(short, long, env = "BOOTH_BIND_ADDR")]
    bind: Option<String>,

    /// Storage root holding buffer/, draft/, sent/ and trash/
    #[arg(short, long, env = "BOOTH_STORAGE_ROOT")]
    storage_root: Option<PathBuf>,

    /// Watermark overlay image
    #[arg(short, long, env = "BOOTH_OVERLAY")]
    overlay: Option<PathBuf>,

    /// Milliseconds a capture's size must stay unchanged before processing
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Config file (TOML)
    #[arg(short, long, env = "BOOTH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = IngestConfig::load(
        args.config.as_deref(),
        Overrides {
            bind_addr: args.bind,
            storage_root: args.storage_root,
            overlay_path: args.overlay,
            settle_ms: args.settle_ms,
        },
    )
    .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting booth-ingest v{}", env!("CARGO_PKG_VERSION"));
    info!("Storage root: {}", config.storage_root.display());

    let watermarker = match Watermarker::load(&config.overlay_path) {
        Ok(watermarker) => {
            info!("✓ Loaded watermark overlay {}", config.overlay_path.display());
            watermarker
        }
        Err(e) => {
            error!("Cannot start without a watermark overlay: {}", e);
            return Err(e).context("Failed to load watermark overlay");
        }
    };

    let layout = config.layout();
    layout
        .ensure_directories()
        .context("Failed to create storage directories")?;

    let register = RegisterHandle::spawn();
    let hub = Hub::new(register.clone(), config.hub_outbound_capacity);

    let cancel = CancellationToken::new();
    let watcher = IngestWatcher::new(
        Relocator::new(layout.clone(), watermarker),
        register,
        hub.clone(),
        config.settle,
    );
    let watch_task = watcher
        .clone()
        .spawn(cancel.clone())
        .context("Failed to start landing zone watcher")?;

    let app = build_router(AppState::new(hub, GroupStore::new(layout)));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    info!("booth-ingest listening on http://{}", config.bind_addr);
    info!("Hub endpoint: ws://{}/ws", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    if let Err(e) = watch_task.await {
        error!("Watcher task failed: {}", e);
    }
    if tokio::time::timeout(SHUTDOWN_GRACE, watcher.wait_idle())
        .await
        .is_err()
    {
        warn!(
            "{} relocations still in flight at shutdown, sources stay in the landing zone",
            watcher.in_flight()
        );
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
