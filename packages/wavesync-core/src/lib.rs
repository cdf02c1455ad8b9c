//! WaveSync Core - shared radio playback synchronization.
//!
//! Keeps a single playback timeline (which track, at what offset, from which
//! playlist) consistent across any number of connected listeners. Listeners
//! decode audio locally and align to the server clock; the core only decides
//! what is playing and tells everyone, in order.
//!
//! # Architecture
//!
//! - [`playback`]: the shared state machine and the [`SyncEngine`] that drives it
//! - [`events`]: topic pub/sub decoupling the engine from fan-out
//! - [`api`]: listener hub, WebSocket protocol and HTTP admin surface
//! - [`catalog`]: catalog and media collaborators, with reference implementations
//! - [`state`]: configuration
//! - [`error`]: centralized error types
//!
//! # Abstraction Traits
//!
//! - [`Catalog`](catalog::Catalog) / [`MediaStore`](catalog::MediaStore): storage collaborators
//! - [`EventEmitter`](events::EventEmitter): where the engine sends transitions
//! - [`TaskSpawner`](runtime::TaskSpawner): spawning background tasks
//!
//! [`bootstrap_services`] wires the default composition used by the server.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod catalog;
pub mod error;
pub mod events;
pub mod playback;
pub mod protocol_constants;
pub mod runtime;
pub mod state;
pub mod utils;

// Re-export commonly used types at the crate root
pub use catalog::{
    Catalog, CatalogDefinition, CatalogError, InMemoryCatalog, LocalMediaStore, MediaError,
    MediaStore, Playlist, PlaylistDefinition, Track,
};
pub use error::{ErrorCode, WavesyncError, WavesyncResult};
pub use events::{
    EventBus, EventEmitter, EventHandler, HandlerError, NoopEventEmitter, PlaybackEvent,
    SubscriptionId, Topic,
};
pub use playback::{PlaybackSnapshot, QueueInfo, SongChange, SyncEngine};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{Config, FanoutConfig, PlaybackConfig};
pub use utils::now_millis;

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices};

// Re-export API types
pub use api::{bind, serve, AppState, Hub, ServerError};
