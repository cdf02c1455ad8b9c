//! Media store backed by a local directory of audio files.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::traits::{MediaError, MediaResult, MediaStore};
use super::types::Track;

/// Resolves each track's storage key to a file under a media directory.
///
/// `ensure` succeeds when the file exists and is non-empty. Keys that would
/// escape the directory (absolute paths, `..`) are treated as unavailable.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    /// Creates a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the media directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a storage key to a path inside the media directory.
    fn resolve(&self, storage_key: &str) -> Option<PathBuf> {
        let key = Path::new(storage_key);
        let confined = key
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        (confined && !storage_key.is_empty()).then(|| self.root.join(key))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn ensure(&self, track: &Track) -> MediaResult<()> {
        let unavailable = |reason: &str| MediaError::Unavailable {
            track_id: track.id.clone(),
            reason: reason.to_string(),
        };

        let path = self
            .resolve(&track.storage_key)
            .ok_or_else(|| unavailable("storage key escapes media directory"))?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
            Ok(_) => Err(unavailable("not a non-empty file")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(unavailable(&format!("missing {}", path.display())))
            }
            Err(e) => Err(MediaError::Io(e)),
        }
    }
}
