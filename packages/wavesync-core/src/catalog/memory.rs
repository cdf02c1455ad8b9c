//! In-memory catalog built from a declarative catalog definition.
//!
//! Used by the standalone server (loaded from a YAML catalog file) and by
//! tests. Play statistics are kept in memory only.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use super::traits::{Catalog, CatalogError, CatalogResult};
use super::types::{Playlist, Track};
use crate::utils::now_millis;

/// A playlist entry in a catalog definition: metadata plus ordered track ids.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Track ids in play order. Must reference entries in `tracks`.
    #[serde(default)]
    pub tracks: Vec<String>,
}

/// Serialized shape of a catalog file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogDefinition {
    #[serde(default)]
    pub playlists: Vec<PlaylistDefinition>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Play statistics tracked per track id.
#[derive(Debug, Clone, Copy, Default)]
struct PlayStats {
    last_played_ms: Option<u64>,
    play_count: u64,
}

/// Catalog held entirely in memory.
pub struct InMemoryCatalog {
    /// Playlists in definition order.
    playlists: Vec<Playlist>,
    /// playlist_id -> ordered track ids
    playlist_tracks: HashMap<String, Vec<String>>,
    /// track_id -> track metadata
    tracks: HashMap<String, Track>,
    /// track_id -> play statistics (mutable at runtime)
    stats: DashMap<String, PlayStats>,
}

impl InMemoryCatalog {
    /// Builds a catalog from a definition.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::TrackNotFound`] if a playlist references a
    /// track id missing from `tracks`, or [`CatalogError::DuplicatePlaylist`]
    /// if two playlists share an id.
    pub fn from_definition(definition: CatalogDefinition) -> CatalogResult<Self> {
        let tracks: HashMap<String, Track> = definition
            .tracks
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();

        let stats = DashMap::new();
        for track in tracks.values() {
            stats.insert(
                track.id.clone(),
                PlayStats {
                    last_played_ms: track.last_played_ms,
                    play_count: track.play_count,
                },
            );
        }

        let mut playlists = Vec::with_capacity(definition.playlists.len());
        let mut playlist_tracks = HashMap::new();
        for def in definition.playlists {
            if let Some(missing) = def.tracks.iter().find(|id| !tracks.contains_key(*id)) {
                return Err(CatalogError::TrackNotFound(format!(
                    "{} (referenced by playlist {})",
                    missing, def.id
                )));
            }
            if playlist_tracks.contains_key(&def.id) {
                return Err(CatalogError::DuplicatePlaylist(def.id));
            }
            playlist_tracks.insert(def.id.clone(), def.tracks);
            playlists.push(Playlist {
                id: def.id,
                name: def.name,
                description: def.description,
            });
        }

        log::info!(
            "[Catalog] Loaded {} playlist(s), {} track(s)",
            playlists.len(),
            tracks.len()
        );

        Ok(Self {
            playlists,
            playlist_tracks,
            tracks,
            stats,
        })
    }

    /// Returns the play count recorded for a track.
    #[must_use]
    pub fn play_count(&self, track_id: &str) -> u64 {
        self.stats.get(track_id).map_or(0, |s| s.play_count)
    }

    fn with_stats(&self, track: &Track) -> Track {
        let mut track = track.clone();
        if let Some(stats) = self.stats.get(&track.id) {
            track.last_played_ms = stats.last_played_ms;
            track.play_count = stats.play_count;
        }
        track
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
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
        let ids = self
            .playlist_tracks
            .get(playlist_id)
            .ok_or_else(|| CatalogError::PlaylistNotFound(playlist_id.to_string()))?;
        // from_definition guarantees every referenced id resolves
        Ok(ids
            .iter()
            .filter_map(|id| self.tracks.get(id))
            .map(|t| self.with_stats(t))
            .collect())
    }

    async fn record_play(&self, track_id: &str) -> CatalogResult<()> {
        if !self.tracks.contains_key(track_id) {
            return Err(CatalogError::TrackNotFound(track_id.to_string()));
        }
        let mut entry = self.stats.entry(track_id.to_string()).or_default();
        entry.play_count += 1;
        entry.last_played_ms = Some(now_millis());
        Ok(())
    }
}
