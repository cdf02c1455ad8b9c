//! Core configuration types.
//!
//! [`Config`] holds every tunable the engine, event bus and connection hub
//! read at construction time. The server binary builds it from YAML plus
//! environment and CLI overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    DEFAULT_EVENT_SUBSCRIBER_CAPACITY, DEFAULT_MEDIA_ENSURE_TIMEOUT_MS,
    DEFAULT_QUEUE_SYNC_INTERVAL_SECS, DEFAULT_TICK_INTERVAL_MS, DEFAULT_WS_OUTBOUND_CAPACITY,
    DEFAULT_WS_PING_INTERVAL_SECS, DEFAULT_WS_READ_DEADLINE_SECS, DEFAULT_WS_WRITE_DEADLINE_SECS,
};

/// Configuration for playback scheduling.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Resolution of the autonomous advance loop (milliseconds).
    pub tick_interval_ms: u64,

    /// How long a transition waits on the media store before proceeding (milliseconds).
    pub media_ensure_timeout_ms: u64,

    /// Interval between passive queue refresh broadcasts (seconds, 0 disables).
    pub queue_sync_interval_secs: u64,

    /// Whether queues are shuffled on activation and on each new cycle.
    pub shuffle: bool,

    /// Playlist activated at startup. `None` picks the first catalog playlist.
    pub initial_playlist_id: Option<String>,
}

impl PlaybackConfig {
    /// Returns the advance loop tick interval.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Returns the media availability timeout.
    #[must_use]
    pub fn media_ensure_timeout(&self) -> Duration {
        Duration::from_millis(self.media_ensure_timeout_ms)
    }

    /// Returns the passive refresh interval, if enabled.
    #[must_use]
    pub fn queue_sync_interval(&self) -> Option<Duration> {
        (self.queue_sync_interval_secs > 0)
            .then(|| Duration::from_secs(self.queue_sync_interval_secs))
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            media_ensure_timeout_ms: DEFAULT_MEDIA_ENSURE_TIMEOUT_MS,
            queue_sync_interval_secs: DEFAULT_QUEUE_SYNC_INTERVAL_SECS,
            shuffle: true,
            initial_playlist_id: None,
        }
    }
}

/// Configuration for listener connections and event fan-out.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FanoutConfig {
    /// Per-subscriber event queue depth (drop-oldest beyond this).
    pub event_subscriber_capacity: usize,

    /// Per-connection outbound queue depth (eviction beyond this).
    pub ws_outbound_capacity: usize,

    /// Close a connection after this long without inbound traffic (seconds).
    pub ws_read_deadline_secs: u64,

    /// Abandon a single frame write after this long (seconds).
    pub ws_write_deadline_secs: u64,

    /// Interval between server ping frames (seconds).
    pub ws_ping_interval_secs: u64,
}

impl FanoutConfig {
    /// Returns the inbound read deadline.
    #[must_use]
    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.ws_read_deadline_secs)
    }

    /// Returns the outbound write deadline.
    #[must_use]
    pub fn write_deadline(&self) -> Duration {
        Duration::from_secs(self.ws_write_deadline_secs)
    }

    /// Returns the server ping interval.
    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ws_ping_interval_secs)
    }
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            event_subscriber_capacity: DEFAULT_EVENT_SUBSCRIBER_CAPACITY,
            ws_outbound_capacity: DEFAULT_WS_OUTBOUND_CAPACITY,
            ws_read_deadline_secs: DEFAULT_WS_READ_DEADLINE_SECS,
            ws_write_deadline_secs: DEFAULT_WS_WRITE_DEADLINE_SECS,
            ws_ping_interval_secs: DEFAULT_WS_PING_INTERVAL_SECS,
        }
    }
}

/// Configuration for the WaveSync core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Preferred port for the HTTP/WS server (0 = OS-assigned).
    pub preferred_port: u16,

    /// Playback scheduling.
    pub playback: PlaybackConfig,

    /// Listener fan-out.
    pub fanout: FanoutConfig,
}

impl Config {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first value that would cause runtime issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.playback.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be >= 1 (interval panics on zero)".to_string());
        }
        if self.fanout.event_subscriber_capacity == 0 {
            return Err("event_subscriber_capacity must be >= 1".to_string());
        }
        if self.fanout.ws_outbound_capacity < 2 {
            return Err(
                "ws_outbound_capacity must be >= 2 (join snapshot is two messages)".to_string(),
            );
        }
        if self.fanout.ws_ping_interval_secs == 0 {
            return Err("ws_ping_interval_secs must be >= 1".to_string());
        }
        if self.fanout.ws_write_deadline_secs == 0 {
            return Err("ws_write_deadline_secs must be >= 1".to_string());
        }
        if self.fanout.ws_ping_interval_secs >= self.fanout.ws_read_deadline_secs {
            return Err(format!(
                "ws_ping_interval_secs ({}) must be shorter than ws_read_deadline_secs ({})",
                self.fanout.ws_ping_interval_secs, self.fanout.ws_read_deadline_secs
            ));
        }
        Ok(())
    }
}
