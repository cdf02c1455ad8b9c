//! Playback state and its client-facing projections.
//!
//! [`PlaybackState`] is plain data plus the invariants that keep it valid.
//! Locking, timing and event emission belong to [`SyncEngine`](super::SyncEngine).

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::Serialize;
use tokio::time::Instant;

use crate::catalog::{Playlist, Track};
use crate::error::{WavesyncError, WavesyncResult};
use crate::utils::wall_clock_start;

// ─────────────────────────────────────────────────────────────────────────────
// Queue
// ─────────────────────────────────────────────────────────────────────────────

/// The ordered, currently-active tracks of a playlist.
///
/// Immutable once built. Reshuffles and playlist switches build a new queue
/// and swap the `Arc`, so readers never observe a resize mid-lookup.
#[derive(Debug, Clone)]
pub struct Queue {
    playlist: Playlist,
    tracks: Vec<Track>,
}

impl Queue {
    /// Builds a queue, optionally shuffled.
    ///
    /// # Errors
    ///
    /// Returns [`WavesyncError::EmptyPlaylist`] if `tracks` is empty.
    pub fn new(playlist: Playlist, mut tracks: Vec<Track>, shuffle: bool) -> WavesyncResult<Self> {
        if tracks.is_empty() {
            return Err(WavesyncError::EmptyPlaylist(playlist.id));
        }
        if shuffle {
            tracks.shuffle(&mut rand::thread_rng());
        }
        Ok(Self { playlist, tracks })
    }

    /// Returns a reshuffled copy for a new play cycle.
    ///
    /// When the queue has more than one track, the track that just finished
    /// is kept out of the first slot so the cycle boundary never repeats it.
    #[must_use]
    pub fn reshuffled(&self, just_played: Option<&str>) -> Self {
        let mut tracks = self.tracks.clone();
        tracks.shuffle(&mut rand::thread_rng());
        if tracks.len() > 1 && just_played.is_some_and(|id| tracks[0].id == id) {
            let last = tracks.len() - 1;
            tracks.swap(0, last);
        }
        Self {
            playlist: self.playlist.clone(),
            tracks,
        }
    }

    #[must_use]
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of tracks. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Never true for a queue built through [`Queue::new`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Playback State
// ─────────────────────────────────────────────────────────────────────────────

/// The authoritative record of what is playing.
///
/// # Invariants
///
/// - `current_index < queue.len()`
/// - while paused, elapsed is frozen at `paused_at - started_at`
#[derive(Debug, Clone)]
pub struct PlaybackState {
    queue: Arc<Queue>,
    current_index: usize,
    started_at: Instant,
    paused_at: Option<Instant>,
    /// Number of completed reshuffles since this queue was activated.
    cycle: u64,
}

impl PlaybackState {
    /// Creates state positioned at the first track, starting at `now`.
    #[must_use]
    pub fn new(queue: Queue, now: Instant) -> Self {
        Self {
            queue: Arc::new(queue),
            current_index: 0,
            started_at: now,
            paused_at: None,
            cycle: 0,
        }
    }

    #[must_use]
    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    #[must_use]
    pub fn current_track(&self) -> &Track {
        &self.queue.tracks[self.current_index]
    }

    /// The track after the current one, wrapping to the start of the queue.
    #[must_use]
    pub fn next_track(&self) -> &Track {
        &self.queue.tracks[(self.current_index + 1) % self.queue.len()]
    }

    /// Time into the current track, frozen while paused.
    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Duration {
        let reference = self.paused_at.unwrap_or(now);
        reference.saturating_duration_since(self.started_at)
    }

    /// Time left in the current track, never negative.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.current_track()
            .duration()
            .saturating_sub(self.elapsed(now))
    }

    /// Moves to the next track. Wrapping past the end reshuffles the queue.
    ///
    /// Returns `true` if a new cycle began.
    pub fn advance(&mut self, now: Instant, reshuffle: bool) -> bool {
        let next = self.current_index + 1;
        let wrapped = next >= self.queue.len();
        if wrapped {
            if reshuffle {
                let just_played = self.current_track().id.clone();
                self.queue = Arc::new(self.queue.reshuffled(Some(&just_played)));
            }
            self.current_index = 0;
            self.cycle += 1;
        } else {
            self.current_index = next;
        }
        self.restart_clock(now);
        wrapped
    }

    /// Moves to the previous track, wrapping to the end. Never reshuffles.
    pub fn retreat(&mut self, now: Instant) {
        let len = self.queue.len();
        self.current_index = (self.current_index + len - 1) % len;
        self.restart_clock(now);
    }

    /// Freezes elapsed time. Returns `false` if already paused.
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.paused_at.is_some() {
            return false;
        }
        self.paused_at = Some(now);
        true
    }

    /// Resumes from the frozen offset. Returns `false` if not paused.
    pub fn resume(&mut self, now: Instant) -> bool {
        let Some(paused_at) = self.paused_at.take() else {
            return false;
        };
        let frozen = paused_at.saturating_duration_since(self.started_at);
        self.started_at = now.checked_sub(frozen).unwrap_or(now);
        true
    }

    /// A track change resets the clock. A paused engine stays paused at 0.
    fn restart_clock(&mut self, now: Instant) {
        self.started_at = now;
        if self.paused_at.is_some() {
            self.paused_at = Some(now);
        }
    }

    /// Projects the client-facing queue view.
    #[must_use]
    pub fn queue_info(&self, now: Instant) -> QueueInfo {
        let elapsed = self.elapsed(now);
        QueueInfo {
            queue: self.queue.tracks.clone(),
            playlist: self.queue.playlist.clone(),
            remaining: self.remaining(now).as_secs_f64(),
            start_time: wall_clock_start(elapsed),
            current_song_index: self.current_index,
        }
    }

    /// Projects the position/pause view.
    #[must_use]
    pub fn snapshot(&self, now: Instant) -> PlaybackSnapshot {
        let song = self.current_track().clone();
        PlaybackSnapshot {
            total_time: f64::from(song.duration),
            elapsed: self.elapsed(now).as_secs_f64(),
            remaining: self.remaining(now).as_secs_f64(),
            paused: self.is_paused(),
            song,
        }
    }

    /// Projects a committed transition.
    #[must_use]
    pub fn song_change(&self, now: Instant) -> SongChange {
        SongChange {
            current_song: self.current_track().clone(),
            next_song: self.next_track().clone(),
            info: self.queue_info(now),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Projections
// ─────────────────────────────────────────────────────────────────────────────

/// Client-facing queue view. Derived on every read, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct QueueInfo {
    pub queue: Vec<Track>,
    pub playlist: Playlist,
    /// Seconds left in the current track.
    pub remaining: f64,
    /// Wall-clock Unix millis at which the current track started.
    pub start_time: u64,
    pub current_song_index: usize,
}

/// A committed track transition with its current/next framing.
#[derive(Debug, Clone, Serialize)]
pub struct SongChange {
    pub current_song: Track,
    pub next_song: Track,
    #[serde(flatten)]
    pub info: QueueInfo,
}

/// Position and pause state of the current track.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSnapshot {
    pub song: Track,
    /// Seconds into the current track.
    pub elapsed: f64,
    /// Seconds left in the current track.
    pub remaining: f64,
    pub paused: bool,
    /// Length of the current track in seconds.
    pub total_time: f64,
}
