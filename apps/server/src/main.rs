//! WaveSync Server - Standalone headless server for WaveSync.
//!
//! Loads a catalog file, starts the synchronization engine, and serves the
//! listener WebSocket and admin HTTP API until interrupted.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use wavesync_core::{bind, bootstrap_services, serve, LocalMediaStore};

use crate::config::{load_catalog, ServerConfig};

/// How long to wait for open connections to drain after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// WaveSync Server - shared radio playback synchronization.
#[derive(Parser, Debug)]
#[command(name = "wavesync-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "WAVESYNC_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "WAVESYNC_BIND_PORT")]
    port: Option<u16>,

    /// Catalog file (overrides config file).
    #[arg(long, value_name = "FILE", env = "WAVESYNC_CATALOG")]
    catalog: Option<PathBuf>,

    /// Media directory (overrides config file).
    #[arg(short = 'm', long, env = "WAVESYNC_MEDIA_DIR")]
    media_dir: Option<PathBuf>,

    /// Playlist to start with (overrides config file).
    #[arg(long, env = "WAVESYNC_PLAYLIST")]
    playlist: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("WaveSync Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(catalog) = args.catalog {
        config.catalog_path = Some(catalog);
    }
    if let Some(media_dir) = args.media_dir {
        config.media_dir = media_dir;
    }
    if let Some(playlist) = args.playlist {
        config.playback.initial_playlist_id = Some(playlist);
    }

    let catalog_path = config
        .catalog_path
        .clone()
        .context("No catalog configured. Pass --catalog or set WAVESYNC_CATALOG")?;

    log::info!(
        "Configuration: bind_port={}, catalog={}, media_dir={}",
        config.bind_port,
        catalog_path.display(),
        config.media_dir.display()
    );

    let catalog = Arc::new(load_catalog(&catalog_path)?);
    let media = Arc::new(LocalMediaStore::new(config.media_dir.clone()));

    let services = bootstrap_services(config.to_core_config(), catalog, media)
        .await
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    services.start_background_tasks();

    let port = services.config.preferred_port;
    let listener = bind(port)
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    let app_state = services.app_state();
    let shutdown = services.cancel_token.child_token();
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, app_state, shutdown).await {
            log::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, cleaning up...");
        }
        _ = &mut server_handle => {
            log::error!("Server exited unexpectedly");
        }
    }

    // Graceful shutdown
    services.shutdown();

    if !server_handle.is_finished()
        && tokio::time::timeout(SHUTDOWN_GRACE, &mut server_handle)
            .await
            .is_err()
    {
        log::warn!("Server did not stop within {:?}, aborting", SHUTDOWN_GRACE);
        server_handle.abort();
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
