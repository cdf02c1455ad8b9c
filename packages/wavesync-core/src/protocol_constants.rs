//! Fixed protocol constants and tuning defaults.
//!
//! Values in the first sections are part of the wire contract with listeners;
//! the rest are defaults for [`Config`](crate::state::Config) fields.

// ─────────────────────────────────────────────────────────────────────────────
// Wire Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Outbound message type for a committed track transition.
pub const MSG_SONG_CHANGE: &str = "song_change";

/// Outbound message type for a passive queue refresh.
pub const MSG_QUEUE_UPDATE: &str = "queue_update";

/// Outbound message type for a position/pause snapshot.
pub const MSG_PLAYBACK_STATE: &str = "playback_state";

/// Outbound reply to an application-level `ping`.
pub const MSG_PONG: &str = "pong";

/// Outbound error notice sent before a connection is closed.
pub const MSG_ERROR: &str = "error";

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier returned by the health endpoint.
pub const SERVICE_ID: &str = "wavesync";

// ─────────────────────────────────────────────────────────────────────────────
// Playback Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Resolution of the autonomous advance loop (milliseconds).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Upper bound on how long a transition waits for media availability (milliseconds).
pub const DEFAULT_MEDIA_ENSURE_TIMEOUT_MS: u64 = 3000;

/// Interval between passive `queue_update` refreshes (seconds, 0 disables).
pub const DEFAULT_QUEUE_SYNC_INTERVAL_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Fan-out Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Per-subscriber event queue depth before the oldest event is dropped.
pub const DEFAULT_EVENT_SUBSCRIBER_CAPACITY: usize = 64;

/// Per-connection outbound queue depth before the connection is evicted.
pub const DEFAULT_WS_OUTBOUND_CAPACITY: usize = 32;

/// A connection silent for this long is closed (seconds).
pub const DEFAULT_WS_READ_DEADLINE_SECS: u64 = 60;

/// Upper bound on a single outbound frame write (seconds).
pub const DEFAULT_WS_WRITE_DEADLINE_SECS: u64 = 10;

/// Interval between server-initiated WebSocket ping frames (seconds).
pub const DEFAULT_WS_PING_INTERVAL_SECS: u64 = 25;
