//! Event system decoupling the engine from listener fan-out.
//!
//! This module provides:
//! - [`EventEmitter`] trait the engine emits transitions through
//! - [`EventBus`], the in-process topic pub/sub that implements it
//! - [`HubBridge`], the bus subscriber that feeds the connection hub
//!
//! Events carry their payloads behind `Arc` so fan-out to many subscribers
//! clones pointers, not track lists.

mod bridge;
mod bus;
mod emitter;

pub use bridge::HubBridge;
pub use bus::{EventBus, EventHandler, HandlerError, SubscriptionId};
pub use emitter::{EventEmitter, NoopEventEmitter};

use std::sync::Arc;

use crate::playback::{PlaybackSnapshot, QueueInfo, SongChange};

/// Bus topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Committed track transitions (advance, skip, previous, playlist switch).
    SongChanged,
    /// Passive queue refreshes.
    QueueUpdated,
    /// Pause/resume changes.
    PlaybackState,
    /// Wildcard for subscribers that want every topic in publish order.
    Any,
}

impl Topic {
    /// Returns whether a subscription to `self` receives events published on `published`.
    #[must_use]
    pub fn matches(self, published: Topic) -> bool {
        self == Topic::Any || self == published
    }
}

/// Events published by the synchronization engine.
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    SongChanged(Arc<SongChange>),
    QueueUpdated(Arc<QueueInfo>),
    PlaybackState(Arc<PlaybackSnapshot>),
}

impl PlaybackEvent {
    /// Returns the topic this event belongs on.
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::SongChanged(_) => Topic::SongChanged,
            Self::QueueUpdated(_) => Topic::QueueUpdated,
            Self::PlaybackState(_) => Topic::PlaybackState,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_every_topic() {
        for topic in [Topic::SongChanged, Topic::QueueUpdated, Topic::PlaybackState] {
            assert!(Topic::Any.matches(topic));
        }
        assert!(Topic::SongChanged.matches(Topic::SongChanged));
        assert!(!Topic::SongChanged.matches(Topic::QueueUpdated));
    }
}
