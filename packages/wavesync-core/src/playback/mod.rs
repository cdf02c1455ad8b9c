//! Playback synchronization core.
//!
//! - [`state`]: the authoritative in-memory playback record and its projections
//! - [`engine`]: the lock-guarded state machine and its autonomous advance loop

pub mod engine;
pub mod state;

pub use engine::SyncEngine;
pub use state::{PlaybackSnapshot, PlaybackState, Queue, QueueInfo, SongChange};
