//! Listener connection tracking and fan-out.
//!
//! - `Hub`: tracks every open listener connection and broadcasts frames to them
//! - `ConnectionGuard`: RAII guard for automatic cleanup on disconnect
//!
//! Each connection owns a bounded outbound queue drained by its writer task.
//! Broadcasts never wait on a connection: a listener whose queue is full has
//! fallen too far behind and is evicted.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

/// Lifecycle of a listener connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug, Default)]
struct SharedState(AtomicU8);

impl SharedState {
    fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Moves forward only; a closed connection never reopens.
    fn advance_to(&self, state: ConnectionState) {
        self.0.fetch_max(state as u8, Ordering::AcqRel);
    }
}

struct ConnectionHandle {
    tx: mpsc::Sender<Utf8Bytes>,
    cancel: CancellationToken,
    state: Arc<SharedState>,
}

/// Outcome of a single broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    pub delivered: usize,
    pub evicted: usize,
}

/// Fan-out hub for listener connections.
///
/// Joins and broadcasts are serialized by a dispatch lock so a joining
/// listener's snapshot and its registration happen with no broadcast in
/// between. Uses hierarchical cancellation tokens for force-close.
pub struct Hub {
    connections: DashMap<u64, ConnectionHandle>,
    next_id: AtomicU64,
    /// Wrapped in RwLock so it can be replaced after close_all().
    global_cancel: RwLock<CancellationToken>,
    dispatch: Mutex<()>,
    outbound_capacity: usize,
}

impl Hub {
    /// Creates a hub whose connections buffer up to `outbound_capacity` frames.
    #[must_use]
    pub fn new(outbound_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            global_cancel: RwLock::new(CancellationToken::new()),
            dispatch: Mutex::new(()),
            outbound_capacity: outbound_capacity.max(1),
        }
    }

    /// Registers a connection, queueing `snapshot()` as its first frames.
    ///
    /// Returns the cleanup guard and the receiving end of the outbound queue
    /// for the connection's writer task.
    pub fn join<F>(self: &Arc<Self>, snapshot: F) -> (ConnectionGuard, mpsc::Receiver<Utf8Bytes>)
    where
        F: FnOnce() -> Vec<Utf8Bytes>,
    {
        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel_token = self.global_cancel.read().child_token();
        let state = Arc::new(SharedState::default());

        {
            let _dispatch = self.dispatch.lock();
            for frame in snapshot() {
                if tx.try_send(frame).is_err() {
                    log::warn!("[Hub] Snapshot for listener {} exceeds outbound queue", id);
                    break;
                }
            }
            state.set(ConnectionState::Open);
            self.connections.insert(
                id,
                ConnectionHandle {
                    tx,
                    cancel: cancel_token.clone(),
                    state: Arc::clone(&state),
                },
            );
        }

        log::info!(
            "[Hub] Listener registered: {} (total: {})",
            id,
            self.connections.len()
        );

        let guard = ConnectionGuard {
            id,
            hub: Arc::clone(self),
            cancel_token,
            state,
        };
        (guard, rx)
    }

    /// Queues a pre-encoded frame on every connection.
    ///
    /// Connections whose queue is full are cancelled and removed; delivery
    /// to the others is unaffected.
    pub fn broadcast(&self, frame: Utf8Bytes) -> BroadcastStats {
        let _dispatch = self.dispatch.lock();

        let mut stats = BroadcastStats::default();
        let mut slow = Vec::new();
        let mut gone = Vec::new();

        for entry in self.connections.iter() {
            match entry.tx.try_send(frame.clone()) {
                Ok(()) => stats.delivered += 1,
                Err(TrySendError::Full(_)) => slow.push(*entry.key()),
                Err(TrySendError::Closed(_)) => gone.push(*entry.key()),
            }
        }

        // Removal happens after iteration; DashMap shards are locked while iterating.
        for id in slow {
            if self.evict(id) {
                stats.evicted += 1;
            }
        }
        for id in gone {
            self.unregister(id);
        }

        stats
    }

    /// Queues a frame for a single connection, evicting it if its queue is full.
    ///
    /// Returns `false` if the frame was not queued.
    pub fn send_to(&self, id: u64, frame: Utf8Bytes) -> bool {
        let result = match self.connections.get(&id) {
            Some(handle) => handle.tx.try_send(frame),
            None => return false,
        };

        match result {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.evict(id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.unregister(id);
                false
            }
        }
    }

    fn evict(&self, id: u64) -> bool {
        match self.connections.remove(&id) {
            Some((_, handle)) => {
                handle.state.advance_to(ConnectionState::Closing);
                handle.cancel.cancel();
                log::warn!(
                    "[Hub] Evicted slow listener {} (remaining: {})",
                    id,
                    self.connections.len()
                );
                true
            }
            None => false,
        }
    }

    /// Unregisters a connection by ID. Idempotent.
    fn unregister(&self, id: u64) {
        if self.connections.remove(&id).is_some() {
            log::info!(
                "[Hub] Listener unregistered: {} (remaining: {})",
                id,
                self.connections.len()
            );
        }
    }

    /// Returns the number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Returns the lifecycle state of a registered connection.
    #[must_use]
    pub fn connection_state(&self, id: u64) -> Option<ConnectionState> {
        self.connections.get(&id).map(|h| h.state.get())
    }

    /// Force-closes all connections.
    ///
    /// Cancels the global token, then installs a fresh one so new
    /// connections can still be accepted.
    ///
    /// Returns the number of connections that were signaled to close.
    pub fn close_all(&self) -> usize {
        let count = self.connections.len();
        for entry in self.connections.iter() {
            entry.state.advance_to(ConnectionState::Closing);
        }

        let mut guard = self.global_cancel.write();
        guard.cancel();
        *guard = CancellationToken::new();

        log::info!("[Hub] Force-closing {} listener(s)", count);
        count
    }
}

/// RAII guard that unregisters a connection when dropped.
///
/// Dropping the guard also drops the hub's sender for the outbound queue,
/// so the writer task drains what is queued and then finishes.
pub struct ConnectionGuard {
    id: u64,
    hub: Arc<Hub>,
    /// Cancelled on eviction or force-close.
    cancel_token: CancellationToken,
    state: Arc<SharedState>,
}

impl ConnectionGuard {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Use in `tokio::select!` to detect eviction and force-close.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Marks the connection as shutting down.
    pub fn mark_closing(&self) {
        self.state.advance_to(ConnectionState::Closing);
    }

    /// Queues a reply for this connection only.
    pub fn send(&self, frame: Utf8Bytes) -> bool {
        self.hub.send_to(self.id, frame)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.advance_to(ConnectionState::Closed);
        self.hub.unregister(self.id);
    }
}
