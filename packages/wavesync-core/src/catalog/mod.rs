//! Catalog and media collaborators.
//!
//! The synchronization engine never touches storage directly. It depends on
//! the [`Catalog`] and [`MediaStore`] traits, supplied at construction and
//! substitutable with test doubles. Reference implementations back the
//! standalone server:
//!
//! - [`InMemoryCatalog`]: playlists and tracks loaded from a catalog file
//! - [`LocalMediaStore`]: audio files resolved under a media directory

mod local_media;
mod memory;
mod traits;
pub mod types;

pub use local_media::LocalMediaStore;
pub use memory::{CatalogDefinition, InMemoryCatalog, PlaylistDefinition};
pub use traits::{Catalog, CatalogError, CatalogResult, MediaError, MediaResult, MediaStore};
pub use types::{Playlist, Track};
