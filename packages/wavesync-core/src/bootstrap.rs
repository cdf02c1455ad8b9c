//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where the
//! engine, event bus and listener hub are instantiated and wired together.
//! There is no global instance; embedders hold the returned
//! [`BootstrappedServices`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::{AppState, Hub};
use crate::catalog::{Catalog, MediaStore};
use crate::error::{WavesyncError, WavesyncResult};
use crate::events::{EventBus, HubBridge};
use crate::playback::SyncEngine;
use crate::runtime::TokioSpawner;
use crate::state::Config;

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// The synchronization engine.
    pub engine: Arc<SyncEngine>,
    /// Event bus the engine publishes on.
    pub bus: Arc<EventBus>,
    /// Listener connection hub.
    pub hub: Arc<Hub>,
    /// Validated configuration.
    pub config: Arc<Config>,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Builds the API layer state.
    #[must_use]
    pub fn app_state(&self) -> AppState {
        AppState {
            engine: Arc::clone(&self.engine),
            hub: Arc::clone(&self.hub),
            config: Arc::clone(&self.config),
        }
    }

    /// Starts the advance loop. Returns `false` if it was already running.
    pub fn start_background_tasks(&self) -> bool {
        self.engine
            .start_advance_loop(self.cancel_token.child_token())
    }

    /// Initiates graceful shutdown of all services.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Stops the advance loop and anything else holding a child token.
        self.cancel_token.cancel();

        let closed = self.hub.close_all();
        log::info!("[Bootstrap] Closed {} listener connection(s)", closed);

        self.bus.shutdown();

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all services with their dependencies.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`WavesyncError::Configuration`] for invalid configuration, or
/// the engine's startup error if the catalog has nothing to play.
pub async fn bootstrap_services(
    config: Config,
    catalog: Arc<dyn Catalog>,
    media: Arc<dyn MediaStore>,
) -> WavesyncResult<BootstrappedServices> {
    config.validate().map_err(WavesyncError::Configuration)?;

    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();

    let bus = Arc::new(EventBus::new(
        config.fanout.event_subscriber_capacity,
        spawner.clone(),
    ));
    let hub = Arc::new(Hub::new(config.fanout.ws_outbound_capacity));
    let bridge = HubBridge::attach(&bus, Arc::clone(&hub));
    log::debug!("[Bootstrap] Hub bridge subscribed as #{}", bridge);

    let engine = match SyncEngine::new(
        catalog,
        media,
        bus.clone(),
        config.playback.clone(),
        spawner,
    )
    .await
    {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            bus.shutdown();
            return Err(e);
        }
    };

    log::info!("[Bootstrap] Services wired");

    Ok(BootstrappedServices {
        engine,
        bus,
        hub,
        config: Arc::new(config),
        cancel_token,
    })
}
