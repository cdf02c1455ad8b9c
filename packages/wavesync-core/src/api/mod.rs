//! HTTP/WebSocket API layer.
//!
//! Thin handlers over the engine, the listener hub, and server startup.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::playback::SyncEngine;
use crate::state::Config;

pub mod http;
pub mod hub;
pub mod protocol;
pub mod response;
pub mod ws;

pub use hub::{BroadcastStats, ConnectionGuard, ConnectionState, Hub};

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub hub: Arc<Hub>,
    pub config: Arc<Config>,
}

/// Binds the listener socket. Port 0 lets the OS pick.
pub async fn bind(port: u16) -> Result<TcpListener, ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    Ok(TcpListener::bind(&addr).await?)
}

/// Serves the API on an already-bound listener until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    log::info!("Server listening on http://{}", addr);

    let app = http::create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    log::info!("Server stopped");
    Ok(())
}
