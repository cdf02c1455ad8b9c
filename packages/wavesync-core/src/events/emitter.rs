//! Event emitter abstraction for decoupling the engine from transport.
//!
//! The engine depends on the [`EventEmitter`] trait rather than on the bus,
//! enabling testing and alternative transports.

use crate::playback::{PlaybackSnapshot, QueueInfo, SongChange};

/// Trait for emitting playback events without knowledge of transport.
///
/// Implementations must not block: the engine calls these from its
/// transition path after releasing the state lock.
pub trait EventEmitter: Send + Sync {
    /// Emits a committed track transition.
    fn emit_song_change(&self, event: SongChange);

    /// Emits a passive queue refresh.
    fn emit_queue_update(&self, event: QueueInfo);

    /// Emits a pause/resume change.
    fn emit_playback_state(&self, event: PlaybackSnapshot);
}

/// No-op emitter for embedding the engine without listeners.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_song_change(&self, _event: SongChange) {}

    fn emit_queue_update(&self, _event: QueueInfo) {}

    fn emit_playback_state(&self, _event: PlaybackSnapshot) {}
}
