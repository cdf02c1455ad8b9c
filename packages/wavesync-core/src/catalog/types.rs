//! Catalog value types shared by the engine and the wire protocol.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A single playable audio item.
///
/// Owned by the catalog; the engine treats it as read-only value data.
/// Play statistics reflect the catalog's view when the queue was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Unique external identifier (e.g. the upstream video/catalog id).
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Track length in whole seconds.
    pub duration: u32,
    /// Key under which the media store holds this track's audio bytes.
    pub storage_key: String,
    /// Unix millis of the most recent play, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played_ms: Option<u64>,
    #[serde(default)]
    pub play_count: u64,
}

impl Track {
    /// Returns the track length as a [`Duration`].
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration))
    }
}

/// A named, ordered collection of tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Builds a track with the given id and duration in seconds.
    pub fn track(id: &str, duration: u32) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Title {id}"),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            duration,
            storage_key: format!("{id}.mp3"),
            last_played_ms: None,
            play_count: 0,
        }
    }

    /// Builds a playlist with the given id.
    pub fn playlist(id: &str) -> Playlist {
        Playlist {
            id: id.to_string(),
            name: format!("Playlist {id}"),
            description: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_converts_seconds() {
        assert_eq!(fixtures::track("a", 185).duration(), Duration::from_secs(185));
    }

    #[test]
    fn unplayed_track_omits_last_played() {
        let json = serde_json::to_value(fixtures::track("a", 5)).unwrap();
        assert!(json.get("last_played_ms").is_none());
        assert_eq!(json["storage_key"], "a.mp3");
    }
}
