//! Trait abstractions for the engine's external collaborators.
//!
//! These traits enable dependency injection for testability. The engine
//! depends on traits rather than concrete storage backends.

use async_trait::async_trait;
use thiserror::Error;

use super::types::{Playlist, Track};

/// Errors returned by a [`Catalog`].
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No playlist with the requested id.
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),

    /// No track with the requested id.
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// Two playlists share an id.
    #[error("Duplicate playlist id: {0}")]
    DuplicatePlaylist(String),

    /// The backing store failed (connection, query, decode).
    #[error("Catalog backend error: {0}")]
    Backend(String),
}

/// Convenient Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors returned by a [`MediaStore`].
#[derive(Debug, Error)]
pub enum MediaError {
    /// The track's audio bytes are missing or unusable.
    #[error("Media unavailable for {track_id}: {reason}")]
    Unavailable { track_id: String, reason: String },

    /// Filesystem or transport failure while checking availability.
    #[error("Media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient Result alias for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Source of playlists and their ordered tracks.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Lists every playlist, in catalog order.
    async fn list_playlists(&self) -> CatalogResult<Vec<Playlist>>;

    /// Fetches a single playlist by id.
    ///
    /// Returns [`CatalogError::PlaylistNotFound`] for unknown ids.
    async fn get_playlist(&self, id: &str) -> CatalogResult<Playlist>;

    /// Fetches the ordered tracks of a playlist. May be empty.
    async fn get_tracks(&self, playlist_id: &str) -> CatalogResult<Vec<Track>>;

    /// Records that a track became current (last-played time, play count).
    async fn record_play(&self, track_id: &str) -> CatalogResult<()>;
}

/// Guarantees a track's audio bytes are retrievable by listeners.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Ensures the track's media is present, fetching or preparing it if needed.
    ///
    /// Must be idempotent and safe to call repeatedly. Callers bound the wait
    /// with their own timeout.
    async fn ensure(&self, track: &Track) -> MediaResult<()>;
}
