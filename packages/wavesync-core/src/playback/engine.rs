//! Shared-timeline synchronization engine.
//!
//! [`SyncEngine`] owns the single [`PlaybackState`] every listener follows.
//! Transitions come from two sources: the autonomous advance loop, which
//! moves on when the current track's remaining time reaches zero, and
//! explicit commands (skip, previous, playlist switch, pause/resume).
//!
//! All transitions are serialized by an async transition lock held from
//! commit through publish, so listeners observe changes in commit order.
//! The state itself sits behind a short-lived `RwLock` that is never held
//! across an await point or while calling out to collaborators.

use std::future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::state::{PlaybackSnapshot, PlaybackState, Queue, QueueInfo, SongChange};
use crate::catalog::{Catalog, MediaStore, Track};
use crate::error::{ErrorCode, WavesyncError, WavesyncResult};
use crate::events::EventEmitter;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::state::PlaybackConfig;

/// The synchronization engine.
pub struct SyncEngine {
    state: RwLock<PlaybackState>,
    transition_lock: tokio::sync::Mutex<()>,
    catalog: Arc<dyn Catalog>,
    media: Arc<dyn MediaStore>,
    emitter: Arc<dyn EventEmitter>,
    spawner: TokioSpawner,
    config: PlaybackConfig,
    loop_started: AtomicBool,
}

impl SyncEngine {
    /// Builds the engine with its initial queue loaded and the clock started.
    ///
    /// Uses `config.initial_playlist_id` when set, otherwise the first
    /// catalog playlist that has tracks.
    ///
    /// # Errors
    ///
    /// Returns [`WavesyncError::NoPlaylists`] if the catalog has no playable
    /// playlist, or the lookup error for an explicitly configured one.
    pub async fn new(
        catalog: Arc<dyn Catalog>,
        media: Arc<dyn MediaStore>,
        emitter: Arc<dyn EventEmitter>,
        config: PlaybackConfig,
        spawner: TokioSpawner,
    ) -> WavesyncResult<Self> {
        let queue = match config.initial_playlist_id.as_deref() {
            Some(id) => load_queue(catalog.as_ref(), id, config.shuffle).await?,
            None => first_playable_queue(catalog.as_ref(), config.shuffle).await?,
        };

        log::info!(
            "[Engine] Starting with playlist '{}' ({} tracks)",
            queue.playlist().name,
            queue.len()
        );

        let engine = Self {
            state: RwLock::new(PlaybackState::new(queue, Instant::now())),
            transition_lock: tokio::sync::Mutex::new(()),
            catalog,
            media,
            emitter,
            spawner,
            config,
            loop_started: AtomicBool::new(false),
        };

        let (current, next) = {
            let state = engine.state.read();
            (state.current_track().clone(), state.next_track().clone())
        };
        engine.ensure_media(&current).await;
        engine.prefetch(next);
        engine.record_play(current.id);

        Ok(engine)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Copies the state out so projections are computed without the lock.
    fn view(&self) -> PlaybackState {
        self.state.read().clone()
    }

    #[must_use]
    pub fn current_track(&self) -> Track {
        self.state.read().current_track().clone()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.read().current_index()
    }

    /// Number of times the queue has wrapped since the last activation.
    #[must_use]
    pub fn play_cycle(&self) -> u64 {
        self.state.read().cycle()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.read().is_paused()
    }

    /// Time into the current track on the shared timeline.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.view().elapsed(Instant::now())
    }

    /// Time left in the current track, clamped at zero.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.view().remaining(Instant::now())
    }

    /// The active queue.
    #[must_use]
    pub fn queue(&self) -> Arc<Queue> {
        Arc::clone(self.state.read().queue())
    }

    #[must_use]
    pub fn queue_info(&self) -> QueueInfo {
        self.view().queue_info(Instant::now())
    }

    #[must_use]
    pub fn playback_snapshot(&self) -> PlaybackSnapshot {
        self.view().snapshot(Instant::now())
    }

    /// Queue and playback projections taken from one read of the state.
    #[must_use]
    pub fn join_snapshot(&self) -> (QueueInfo, PlaybackSnapshot) {
        let view = self.view();
        let now = Instant::now();
        (view.queue_info(now), view.snapshot(now))
    }

    #[must_use]
    pub fn song_change(&self) -> SongChange {
        self.view().song_change(Instant::now())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Skips to the next track. Wrapping starts a new cycle.
    pub async fn next(&self) -> SongChange {
        let shuffle = self.config.shuffle;
        self.transition("skip", |state, now| {
            state.advance(now, shuffle);
            true
        })
        .await
        // The mutation above always commits.
        .unwrap_or_else(|| self.song_change())
    }

    /// Returns to the previous track, wrapping to the end of the queue.
    pub async fn previous(&self) -> SongChange {
        self.transition("previous", |state, now| {
            state.retreat(now);
            true
        })
        .await
        .unwrap_or_else(|| self.song_change())
    }

    /// Activates another playlist, starting at its first track.
    ///
    /// The catalog is consulted before anything is committed, so a failed
    /// lookup leaves playback untouched.
    ///
    /// # Errors
    ///
    /// Returns [`WavesyncError::PlaylistNotFound`] for an unknown id,
    /// [`WavesyncError::EmptyPlaylist`] if it has no tracks, or a catalog error.
    pub async fn switch_playlist(&self, playlist_id: &str) -> WavesyncResult<SongChange> {
        let queue = load_queue(self.catalog.as_ref(), playlist_id, self.config.shuffle).await?;

        log::info!(
            "[Engine] Switching to playlist '{}' ({} tracks)",
            queue.playlist().name,
            queue.len()
        );

        let change = self
            .transition("playlist switch", move |state, now| {
                *state = PlaybackState::new(queue, now);
                true
            })
            .await
            .unwrap_or_else(|| self.song_change());
        Ok(change)
    }

    /// Freezes the shared clock. Idempotent.
    pub async fn pause(&self) -> PlaybackSnapshot {
        self.set_paused(true).await
    }

    /// Restarts the shared clock from where it was frozen. Idempotent.
    pub async fn resume(&self) -> PlaybackSnapshot {
        self.set_paused(false).await
    }

    async fn set_paused(&self, paused: bool) -> PlaybackSnapshot {
        let _order = self.transition_lock.lock().await;

        let (changed, view) = {
            let mut state = self.state.write();
            let now = Instant::now();
            let changed = if paused {
                state.pause(now)
            } else {
                state.resume(now)
            };
            (changed, state.clone())
        };

        let snapshot = view.snapshot(Instant::now());
        if changed {
            log::info!(
                "[Engine] Playback {} at {:.1}s into '{}'",
                if paused { "paused" } else { "resumed" },
                snapshot.elapsed,
                snapshot.song.title
            );
            self.emitter.emit_playback_state(snapshot.clone());
        }
        snapshot
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Advance loop
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts the autonomous advance loop on the engine's spawner.
    ///
    /// Only one loop may run per engine; returns `false` if already started.
    pub fn start_advance_loop(self: &Arc<Self>, cancel: CancellationToken) -> bool {
        if self
            .loop_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("[Engine] Advance loop already running, ignoring start request");
            return false;
        }

        let engine = Arc::clone(self);
        self.spawner.spawn(async move {
            engine.run_advance_loop(cancel).await;
        });
        true
    }

    async fn run_advance_loop(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut sync_ticker = self.config.queue_sync_interval().map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        log::info!(
            "[Engine] Advance loop started (tick {:?})",
            self.config.tick_interval()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = next_sync(&mut sync_ticker) => {
                    self.publish_queue_update().await;
                }
            }
        }

        log::info!("[Engine] Advance loop stopped");
    }

    /// Rebroadcasts the queue. Held under the transition lock so it can never
    /// land behind a newer `song_change`.
    async fn publish_queue_update(&self) {
        let _order = self.transition_lock.lock().await;
        self.emitter.emit_queue_update(self.queue_info());
    }

    /// Advances if the current track has run out. Returns the committed change.
    async fn tick(&self) -> Option<SongChange> {
        {
            let state = self.state.read();
            if state.is_paused() || !state.remaining(Instant::now()).is_zero() {
                return None;
            }
        }

        let shuffle = self.config.shuffle;
        self.transition("advance", |state, now| {
            // A command may have committed while we waited for the lock.
            if state.is_paused() || !state.remaining(now).is_zero() {
                return false;
            }
            state.advance(now, shuffle);
            true
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transition pipeline
    // ─────────────────────────────────────────────────────────────────────────

    /// Commits `mutate` under the state lock, then makes the new track
    /// available and publishes, all under the transition lock.
    ///
    /// `mutate` returns `false` to abandon the transition.
    async fn transition<F>(&self, reason: &'static str, mutate: F) -> Option<SongChange>
    where
        F: FnOnce(&mut PlaybackState, Instant) -> bool,
    {
        let _order = self.transition_lock.lock().await;

        let committed = {
            let mut state = self.state.write();
            if !mutate(&mut *state, Instant::now()) {
                return None;
            }
            state.clone()
        };

        let current = committed.current_track().clone();
        let next = committed.next_track().clone();

        log::info!(
            "[Engine] {} -> [{}] '{}' by {} (cycle {})",
            reason,
            committed.current_index(),
            current.title,
            current.artist,
            committed.cycle()
        );

        self.ensure_media(&current).await;

        let change = committed.song_change(Instant::now());
        self.emitter.emit_song_change(change.clone());

        self.prefetch(next);
        self.record_play(current.id);
        Some(change)
    }

    /// Waits a bounded time for the media store. Failures never stall the schedule.
    async fn ensure_media(&self, track: &Track) {
        let limit = self.config.media_ensure_timeout();
        match tokio::time::timeout(limit, self.media.ensure(track)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::warn!(
                    "[Engine] Media for '{}' unavailable ({}): {}",
                    track.id,
                    e.code(),
                    e
                );
            }
            Err(_) => {
                log::warn!(
                    "[Engine] Media for '{}' not ready after {:?}, continuing",
                    track.id,
                    limit
                );
            }
        }
    }

    fn prefetch(&self, track: Track) {
        let media = Arc::clone(&self.media);
        self.spawner.spawn(async move {
            if let Err(e) = media.ensure(&track).await {
                log::debug!("[Engine] Prefetch of '{}' failed: {}", track.id, e);
            }
        });
    }

    fn record_play(&self, track_id: String) {
        let catalog = Arc::clone(&self.catalog);
        self.spawner.spawn(async move {
            if let Err(e) = catalog.record_play(&track_id).await {
                log::warn!("[Engine] Failed to record play of '{}': {}", track_id, e);
            }
        });
    }
}

async fn next_sync(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

async fn load_queue(catalog: &dyn Catalog, playlist_id: &str, shuffle: bool) -> WavesyncResult<Queue> {
    let playlist = catalog.get_playlist(playlist_id).await?;
    let tracks = catalog.get_tracks(playlist_id).await?;
    Queue::new(playlist, tracks, shuffle)
}

async fn first_playable_queue(catalog: &dyn Catalog, shuffle: bool) -> WavesyncResult<Queue> {
    for playlist in catalog.list_playlists().await? {
        match load_queue(catalog, &playlist.id, shuffle).await {
            Ok(queue) => return Ok(queue),
            Err(WavesyncError::EmptyPlaylist(id)) => {
                log::warn!("[Engine] Skipping empty playlist '{}'", id);
            }
            Err(e) => return Err(e),
        }
    }
    Err(WavesyncError::NoPlaylists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::fixtures::{playlist, track};
    use crate::catalog::{CatalogError, CatalogResult, MediaError, MediaResult, Playlist};
    use crate::events::NoopEventEmitter;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    // ─────────────────────────────────────────────────────────────────────────
    // Mock collaborators
    // ─────────────────────────────────────────────────────────────────────────

    struct MockCatalog {
        playlists: Vec<Playlist>,
        tracks: HashMap<String, Vec<Track>>,
        plays: AtomicUsize,
    }

    impl MockCatalog {
        fn new(entries: Vec<(&str, Vec<Track>)>) -> Self {
            Self {
                playlists: entries.iter().map(|(id, _)| playlist(id)).collect(),
                tracks: entries
                    .into_iter()
                    .map(|(id, tracks)| (id.to_string(), tracks))
                    .collect(),
                plays: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Catalog for MockCatalog {
        async fn list_playlists(&self) -> CatalogResult<Vec<Playlist>> {
            Ok(self.playlists.clone())
        }

        async fn get_playlist(&self, id: &str) -> CatalogResult<Playlist> {
            self.playlists
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| CatalogError::PlaylistNotFound(id.to_string()))
        }

        async fn get_tracks(&self, playlist_id: &str) -> CatalogResult<Vec<Track>> {
            self.tracks
                .get(playlist_id)
                .cloned()
                .ok_or_else(|| CatalogError::PlaylistNotFound(playlist_id.to_string()))
        }

        async fn record_play(&self, _track_id: &str) -> CatalogResult<()> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Clone, Copy)]
    enum MediaMode {
        Ready,
        Failing,
        Hanging,
    }

    struct MockMedia {
        mode: MediaMode,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaStore for MockMedia {
        async fn ensure(&self, track: &Track) -> MediaResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                MediaMode::Ready => Ok(()),
                MediaMode::Failing => Err(MediaError::Unavailable {
                    track_id: track.id.clone(),
                    reason: "storage offline".into(),
                }),
                MediaMode::Hanging => future::pending().await,
            }
        }
    }

    #[derive(Default)]
    struct RecordingEmitter {
        changes: Mutex<Vec<SongChange>>,
        queue_updates: Mutex<Vec<usize>>,
        states: Mutex<Vec<bool>>,
    }

    impl EventEmitter for RecordingEmitter {
        fn emit_song_change(&self, event: SongChange) {
            self.changes.lock().push(event);
        }

        fn emit_queue_update(&self, event: QueueInfo) {
            self.queue_updates.lock().push(event.current_song_index);
        }

        fn emit_playback_state(&self, event: PlaybackSnapshot) {
            self.states.lock().push(event.paused);
        }
    }

    fn tracks(prefix: &str, count: usize, secs: u32) -> Vec<Track> {
        (0..count)
            .map(|i| track(&format!("{prefix}{i}"), secs))
            .collect()
    }

    fn test_config() -> PlaybackConfig {
        PlaybackConfig {
            queue_sync_interval_secs: 0,
            ..Default::default()
        }
    }

    struct Harness {
        engine: Arc<SyncEngine>,
        catalog: Arc<MockCatalog>,
        media: Arc<MockMedia>,
        emitter: Arc<RecordingEmitter>,
    }

    async fn harness_with(
        entries: Vec<(&str, Vec<Track>)>,
        mode: MediaMode,
        config: PlaybackConfig,
    ) -> WavesyncResult<Harness> {
        let catalog = Arc::new(MockCatalog::new(entries));
        let media = Arc::new(MockMedia {
            mode,
            calls: AtomicUsize::new(0),
        });
        let emitter = Arc::new(RecordingEmitter::default());
        let engine = SyncEngine::new(
            catalog.clone(),
            media.clone(),
            emitter.clone(),
            config,
            TokioSpawner::current(),
        )
        .await?;
        Ok(Harness {
            engine: Arc::new(engine),
            catalog,
            media,
            emitter,
        })
    }

    async fn harness() -> Harness {
        harness_with(
            vec![("p1", tracks("a", 3, 5)), ("p2", tracks("b", 4, 5))],
            MediaMode::Ready,
            test_config(),
        )
        .await
        .unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Startup
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn starts_at_first_track_of_first_playlist() {
        let h = harness().await;
        assert_eq!(h.engine.current_index(), 0);
        assert_eq!(h.engine.queue().playlist().id, "p1");
        assert_eq!(h.engine.play_cycle(), 0);
        assert_eq!(h.engine.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_catalog_is_startup_error() {
        let result = harness_with(vec![], MediaMode::Ready, test_config()).await;
        assert!(matches!(result, Err(WavesyncError::NoPlaylists)));
    }

    #[tokio::test(start_paused = true)]
    async fn skips_empty_playlists_at_startup() {
        let h = harness_with(
            vec![("empty", vec![]), ("p2", tracks("b", 2, 5))],
            MediaMode::Ready,
            test_config(),
        )
        .await
        .unwrap();
        assert_eq!(h.engine.queue().playlist().id, "p2");
    }

    #[tokio::test(start_paused = true)]
    async fn runs_headless_with_noop_emitter() {
        let engine = SyncEngine::new(
            Arc::new(MockCatalog::new(vec![("p1", tracks("a", 2, 5))])),
            Arc::new(MockMedia {
                mode: MediaMode::Ready,
                calls: AtomicUsize::new(0),
            }),
            Arc::new(NoopEventEmitter),
            test_config(),
            TokioSpawner::current(),
        )
        .await
        .unwrap();

        let change = engine.next().await;
        assert_eq!(change.info.current_song_index, 1);
        assert_eq!(engine.current_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn configured_initial_playlist_is_used() {
        let config = PlaybackConfig {
            initial_playlist_id: Some("p2".into()),
            ..test_config()
        };
        let h = harness_with(
            vec![("p1", tracks("a", 3, 5)), ("p2", tracks("b", 4, 5))],
            MediaMode::Ready,
            config,
        )
        .await
        .unwrap();
        assert_eq!(h.engine.queue().len(), 4);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Advance loop
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn advances_on_schedule_and_wraps() {
        let h = harness().await;
        let cancel = CancellationToken::new();
        assert!(h.engine.start_advance_loop(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(5100)).await;
        assert_eq!(h.engine.current_index(), 1);
        assert_eq!(h.engine.play_cycle(), 0);

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(h.engine.current_index(), 0);
        assert_eq!(h.engine.play_cycle(), 1);
        assert_eq!(h.emitter.changes.lock().len(), 3);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn second_loop_start_is_rejected() {
        let h = harness().await;
        let cancel = CancellationToken::new();
        assert!(h.engine.start_advance_loop(cancel.clone()));
        assert!(!h.engine.start_advance_loop(cancel.clone()));
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_never_increases_between_transitions() {
        let h = harness().await;
        let mut last = h.engine.remaining();
        for _ in 0..40 {
            tokio::time::advance(Duration::from_millis(100)).await;
            let now = h.engine.remaining();
            assert!(now <= last);
            last = now;
        }
        assert_eq!(last, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_engine_does_not_advance() {
        let h = harness().await;
        let cancel = CancellationToken::new();
        h.engine.start_advance_loop(cancel.clone());

        tokio::time::sleep(Duration::from_secs(2)).await;
        h.engine.pause().await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(h.engine.current_index(), 0);
        assert_eq!(h.engine.elapsed(), Duration::from_secs(2));

        h.engine.resume().await;
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(h.engine.current_index(), 1);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn tick_and_skip_at_track_boundary_commit_in_order() {
        let h = harness().await;
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(h.engine.remaining().is_zero());

        let (ticked, skipped) = tokio::join!(h.engine.tick(), h.engine.next());

        // The tick either commits first or finds the skip already moved on.
        let committed = usize::from(ticked.is_some()) + 1;
        let changes = h.emitter.changes.lock();
        assert_eq!(changes.len(), committed);
        for (i, change) in changes.iter().enumerate() {
            assert_eq!(change.info.current_song_index, i + 1);
        }
        assert_eq!(skipped.info.current_song_index, committed);
        assert_eq!(h.engine.current_index(), committed);
        assert_eq!(h.engine.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_rechecks_after_waiting_for_transition_lock() {
        let h = harness().await;
        tokio::time::advance(Duration::from_secs(5)).await;

        let order = h.engine.transition_lock.lock().await;
        let tick = h.engine.tick();
        tokio::pin!(tick);
        assert!(futures::poll!(&mut tick).is_pending());

        // A command commits while the tick is queued behind it.
        h.engine.state.write().advance(Instant::now(), false);
        drop(order);

        assert!(tick.await.is_none());
        assert_eq!(h.engine.current_index(), 1);
        assert!(h.emitter.changes.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn queue_refresh_waits_for_in_flight_transition() {
        let h = harness().await;

        let order = h.engine.transition_lock.lock().await;
        let refresh = h.engine.publish_queue_update();
        tokio::pin!(refresh);
        assert!(futures::poll!(&mut refresh).is_pending());

        h.engine.state.write().advance(Instant::now(), false);
        drop(order);
        refresh.await;

        assert_eq!(*h.emitter.queue_updates.lock(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn join_snapshot_describes_one_track() {
        let h = harness().await;
        h.engine.next().await;
        tokio::time::advance(Duration::from_secs(2)).await;

        let (queue, playback) = h.engine.join_snapshot();
        assert_eq!(queue.current_song_index, 1);
        assert_eq!(playback.song, queue.queue[1]);
        assert_eq!(queue.remaining, playback.remaining);
        assert_eq!(playback.elapsed, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_queue_update_is_published() {
        let config = PlaybackConfig {
            queue_sync_interval_secs: 2,
            ..test_config()
        };
        let h = harness_with(vec![("p1", tracks("a", 3, 60))], MediaMode::Ready, config)
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        h.engine.start_advance_loop(cancel.clone());

        tokio::time::sleep(Duration::from_millis(6100)).await;
        assert_eq!(h.emitter.queue_updates.lock().len(), 3);
        cancel.cancel();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn next_wraps_and_starts_new_cycle() {
        let h = harness().await;
        h.engine.next().await;
        h.engine.next().await;
        assert_eq!(h.engine.current_index(), 2);

        let change = h.engine.next().await;
        assert_eq!(change.info.current_song_index, 0);
        assert_eq!(h.engine.play_cycle(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn next_resets_clock() {
        let h = harness().await;
        tokio::time::advance(Duration::from_secs(3)).await;
        let change = h.engine.next().await;
        assert_eq!(h.engine.elapsed(), Duration::ZERO);
        assert_eq!(change.info.remaining, 5.0);
    }

    #[tokio::test(start_paused = true)]
    async fn previous_wraps_backwards() {
        let h = harness().await;
        let change = h.engine.previous().await;
        assert_eq!(change.info.current_song_index, 2);
        h.engine.previous().await;
        assert_eq!(h.engine.current_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switch_playlist_starts_at_first_track() {
        let h = harness().await;
        h.engine.next().await;

        let change = h.engine.switch_playlist("p2").await.unwrap();
        assert_eq!(change.info.current_song_index, 0);
        assert_eq!(change.info.playlist.id, "p2");
        assert_eq!(h.engine.play_cycle(), 0);

        let mut ids: Vec<_> = h.engine.queue().tracks().iter().map(|t| t.id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["b0", "b1", "b2", "b3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_switch_leaves_state_untouched() {
        let h = harness_with(
            vec![("p1", tracks("a", 3, 5)), ("empty", vec![])],
            MediaMode::Ready,
            test_config(),
        )
        .await
        .unwrap();
        h.engine.next().await;
        let before = h.engine.current_track();
        let published = h.emitter.changes.lock().len();

        let unknown = h.engine.switch_playlist("nope").await;
        assert!(matches!(unknown, Err(WavesyncError::PlaylistNotFound(_))));

        let empty = h.engine.switch_playlist("empty").await;
        assert!(matches!(empty, Err(WavesyncError::EmptyPlaylist(_))));

        assert_eq!(h.engine.current_track(), before);
        assert_eq!(h.engine.queue().playlist().id, "p1");
        assert_eq!(h.emitter.changes.lock().len(), published);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_are_idempotent() {
        let h = harness().await;
        assert!(h.engine.pause().await.paused);
        assert!(h.engine.pause().await.paused);
        assert!(!h.engine.resume().await.paused);
        assert!(!h.engine.resume().await.paused);
        assert_eq!(*h.emitter.states.lock(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_skips_publish_in_commit_order() {
        let h = harness().await;
        let skips = (0..10).map(|_| h.engine.next());
        futures::future::join_all(skips).await;

        let changes = h.emitter.changes.lock();
        assert_eq!(changes.len(), 10);
        for (i, change) in changes.iter().enumerate() {
            assert_eq!(change.info.current_song_index, (i + 1) % 3);
        }
        assert_eq!(h.engine.current_index(), 10 % 3);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collaborator failures
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn media_failure_does_not_stall_schedule() {
        let h = harness_with(vec![("p1", tracks("a", 3, 5))], MediaMode::Failing, test_config())
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        h.engine.start_advance_loop(cancel.clone());

        tokio::time::sleep(Duration::from_millis(10_100)).await;
        assert_eq!(h.engine.current_index(), 2);
        assert!(h.media.calls.load(Ordering::SeqCst) >= 3);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_media_is_bounded_by_timeout() {
        let config = PlaybackConfig {
            media_ensure_timeout_ms: 500,
            ..test_config()
        };
        let h = harness_with(vec![("p1", tracks("a", 3, 5))], MediaMode::Hanging, config)
            .await
            .unwrap();

        let started = Instant::now();
        let change = h.engine.next().await;
        assert_eq!(change.info.current_song_index, 1);
        assert_eq!(started.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn plays_are_recorded_in_background() {
        let h = harness().await;
        h.engine.next().await;
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(h.catalog.plays.load(Ordering::SeqCst), 2);
    }
}
