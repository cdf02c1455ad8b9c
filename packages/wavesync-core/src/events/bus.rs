//! In-process topic pub/sub with isolated, bounded subscribers.
//!
//! Every subscription owns a bounded queue and a dedicated worker task.
//! `publish` only appends to queues, so a slow or failing handler can delay
//! nothing but its own delivery. When a queue is full the oldest pending
//! event is dropped; listeners care about the latest state, not history.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::emitter::EventEmitter;
use super::{PlaybackEvent, Topic};
use crate::playback::{PlaybackSnapshot, QueueInfo, SongChange};
use crate::runtime::{TaskSpawner, TokioSpawner};

/// Identifier returned by [`EventBus::subscribe`].
pub type SubscriptionId = u64;

/// Error returned by a handler that failed to process an event.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Receives events for one subscription.
///
/// Handlers run on the subscription's worker task, one event at a time, in
/// publish order. They must not block for long.
pub trait EventHandler: Send + Sync + 'static {
    fn handle(&self, event: &PlaybackEvent) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(&PlaybackEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, event: &PlaybackEvent) -> Result<(), HandlerError> {
        self(event)
    }
}

struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    name: String,
    queue: Mutex<VecDeque<PlaybackEvent>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
    cancel: CancellationToken,
}

impl Subscription {
    /// Appends an event, dropping the oldest pending one when full.
    fn push(&self, event: PlaybackEvent) {
        let overflowed = {
            let mut queue = self.queue.lock();
            let overflowed = queue.len() >= self.capacity;
            if overflowed {
                queue.pop_front();
            }
            queue.push_back(event);
            overflowed
        };

        if overflowed {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            log::warn!(
                "[EventBus] Subscriber '{}' is behind; dropped oldest event ({} total)",
                self.name,
                dropped
            );
        }
        self.notify.notify_one();
    }
}

/// Topic-based event bus.
pub struct EventBus {
    subscriptions: RwLock<Vec<Arc<Subscription>>>,
    next_id: AtomicU64,
    capacity: usize,
    spawner: TokioSpawner,
    cancel: CancellationToken,
}

impl EventBus {
    /// Creates a bus whose subscribers each buffer up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize, spawner: TokioSpawner) -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            spawner,
            cancel: CancellationToken::new(),
        }
    }

    /// Registers a handler for `topic` and starts its worker task.
    ///
    /// Events published before this call are not replayed.
    pub fn subscribe<H>(&self, topic: Topic, name: impl Into<String>, handler: H) -> SubscriptionId
    where
        H: EventHandler,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let subscription = Arc::new(Subscription {
            id,
            topic,
            name: name.into(),
            queue: Mutex::new(VecDeque::with_capacity(self.capacity)),
            notify: Notify::new(),
            capacity: self.capacity,
            dropped: AtomicU64::new(0),
            cancel: self.cancel.child_token(),
        });

        log::debug!(
            "[EventBus] Subscriber '{}' ({}) registered for {:?}",
            subscription.name,
            id,
            topic
        );

        self.subscriptions.write().push(Arc::clone(&subscription));
        self.spawner
            .spawn(run_worker(subscription, Arc::new(handler)));
        id
    }

    /// Removes a subscription and stops its worker. Pending events are discarded.
    ///
    /// Returns `false` if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut subs = self.subscriptions.write();
            subs.iter()
                .position(|s| s.id == id)
                .map(|pos| subs.remove(pos))
        };

        match removed {
            Some(sub) => {
                sub.cancel.cancel();
                log::debug!("[EventBus] Subscriber '{}' ({}) removed", sub.name, id);
                true
            }
            None => false,
        }
    }

    /// Enqueues `event` for every subscriber matching `topic`.
    ///
    /// Never blocks on handlers. Returns the number of subscribers the event
    /// was queued for.
    pub fn publish(&self, topic: Topic, event: PlaybackEvent) -> usize {
        if self.cancel.is_cancelled() {
            return 0;
        }

        let subs = self.subscriptions.read();
        let mut delivered = 0;
        for sub in subs.iter().filter(|s| s.topic.matches(topic)) {
            sub.push(event.clone());
            delivered += 1;
        }
        delivered
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Number of events dropped for a subscriber because its queue was full.
    #[must_use]
    pub fn dropped_count(&self, id: SubscriptionId) -> Option<u64> {
        self.subscriptions
            .read()
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.dropped.load(Ordering::Relaxed))
    }

    /// Stops all workers and rejects further publishes.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let count = {
            let mut subs = self.subscriptions.write();
            let count = subs.len();
            subs.clear();
            count
        };
        log::info!("[EventBus] Shut down ({} subscribers stopped)", count);
    }
}

macro_rules! impl_emit {
    ($method:ident, $ty:ty, $variant:ident) => {
        fn $method(&self, event: $ty) {
            self.publish(Topic::$variant, PlaybackEvent::$variant(Arc::new(event)));
        }
    };
}

impl EventEmitter for EventBus {
    impl_emit!(emit_song_change, SongChange, SongChanged);
    impl_emit!(emit_queue_update, QueueInfo, QueueUpdated);
    impl_emit!(emit_playback_state, PlaybackSnapshot, PlaybackState);
}

async fn run_worker(sub: Arc<Subscription>, handler: Arc<dyn EventHandler>) {
    loop {
        let next = sub.queue.lock().pop_front();
        match next {
            Some(event) => dispatch(&sub, handler.as_ref(), &event),
            None => {
                tokio::select! {
                    _ = sub.cancel.cancelled() => break,
                    _ = sub.notify.notified() => {}
                }
            }
        }
        if sub.cancel.is_cancelled() {
            break;
        }
    }
    log::debug!("[EventBus] Worker for '{}' stopped", sub.name);
}

fn dispatch(sub: &Subscription, handler: &dyn EventHandler, event: &PlaybackEvent) {
    match catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            log::warn!(
                "[EventBus] Subscriber '{}' failed on {:?}: {}",
                sub.name,
                event.topic(),
                e
            );
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic".to_string());
            log::error!(
                "[EventBus] Subscriber '{}' panicked on {:?}: {}",
                sub.name,
                event.topic(),
                message
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::fixtures::{playlist, track};
    use crate::playback::{PlaybackState, Queue};
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    fn sample_change(index: usize) -> PlaybackEvent {
        let tracks = (0..3).map(|i| track(&format!("t{i}"), 5)).collect();
        let queue = Queue::new(playlist("p1"), tracks, false).unwrap();
        let mut state = PlaybackState::new(queue, Instant::now());
        for _ in 0..index {
            state.advance(Instant::now(), false);
        }
        PlaybackEvent::SongChanged(Arc::new(state.song_change(Instant::now())))
    }

    fn index_of(event: &PlaybackEvent) -> usize {
        match event {
            PlaybackEvent::SongChanged(c) => c.info.current_song_index,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let bus = EventBus::new(16, TokioSpawner::current());
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe(Topic::SongChanged, "recorder", move |e: &PlaybackEvent| {
            let _ = tx.send(index_of(e));
            Ok(())
        });

        for i in 0..3 {
            assert_eq!(bus.publish(Topic::SongChanged, sample_change(i)), 1);
        }

        for expected in 0..3 {
            assert_eq!(rx.recv().await, Some(expected));
        }
    }

    #[tokio::test]
    async fn topic_filtering_and_wildcard() {
        let bus = EventBus::new(16, TokioSpawner::current());
        bus.subscribe(Topic::QueueUpdated, "queue-only", |_: &PlaybackEvent| Ok(()));
        bus.subscribe(Topic::Any, "all", |_: &PlaybackEvent| Ok(()));

        assert_eq!(bus.publish(Topic::SongChanged, sample_change(0)), 1);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn full_queue_drops_oldest() {
        let bus = EventBus::new(2, TokioSpawner::current());
        let gate = Arc::new(std::sync::Barrier::new(2));
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let worker_gate = Arc::clone(&gate);
        let id = bus.subscribe(Topic::SongChanged, "slow", move |e: &PlaybackEvent| {
            let index = index_of(e);
            if index == 0 && started_tx.send(()).is_ok() {
                worker_gate.wait();
            }
            let _ = tx.send(index);
            Ok(())
        });

        // Worker picks up event 0 and parks on the barrier.
        bus.publish(Topic::SongChanged, sample_change(0));
        started_rx.recv().await.unwrap();
        drop(started_rx);

        // Queue holds 2; event 1 is dropped when the third arrives.
        bus.publish(Topic::SongChanged, sample_change(1));
        bus.publish(Topic::SongChanged, sample_change(2));
        bus.publish(Topic::SongChanged, sample_change(0));
        assert_eq!(bus.dropped_count(id), Some(1));

        gate.wait();
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(rx.recv().await.unwrap());
        }
        assert_eq!(seen, vec![0, 2, 0]);
    }

    #[tokio::test]
    async fn panicking_handler_does_not_affect_others() {
        let bus = EventBus::new(8, TokioSpawner::current());
        let (tx, mut rx) = mpsc::unbounded_channel();

        bus.subscribe(Topic::SongChanged, "faulty", |_: &PlaybackEvent| -> Result<(), HandlerError> {
            panic!("handler bug")
        });
        bus.subscribe(Topic::SongChanged, "failing", |_: &PlaybackEvent| {
            Err(HandlerError::new("always fails"))
        });
        bus.subscribe(Topic::SongChanged, "healthy", move |e: &PlaybackEvent| {
            let _ = tx.send(index_of(e));
            Ok(())
        });

        bus.publish(Topic::SongChanged, sample_change(1));
        bus.publish(Topic::SongChanged, sample_change(2));

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new(8, TokioSpawner::current());
        let id = bus.subscribe(Topic::Any, "temp", |_: &PlaybackEvent| Ok(()));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.publish(Topic::SongChanged, sample_change(0)), 0);
    }

    #[tokio::test]
    async fn shutdown_rejects_publishes() {
        let bus = EventBus::new(8, TokioSpawner::current());
        bus.subscribe(Topic::Any, "a", |_: &PlaybackEvent| Ok(()));
        bus.shutdown();

        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(Topic::SongChanged, sample_change(0)), 0);
    }
}
