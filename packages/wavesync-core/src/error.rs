//! Centralized error types for the WaveSync core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{CatalogError, MediaError};

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for CatalogError {
    fn code(&self) -> &'static str {
        match self {
            Self::PlaylistNotFound(_) => "playlist_not_found",
            Self::TrackNotFound(_) => "track_not_found",
            Self::DuplicatePlaylist(_) => "duplicate_playlist",
            Self::Backend(_) => "catalog_backend_error",
        }
    }
}

impl ErrorCode for MediaError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "media_unavailable",
            Self::Io(_) => "media_io_error",
        }
    }
}

/// Application-wide error type.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum WavesyncError {
    /// The requested playlist does not exist.
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),

    /// The requested playlist has no tracks and cannot be activated.
    #[error("Playlist has no tracks: {0}")]
    EmptyPlaylist(String),

    /// The catalog holds no playlists at all (fatal at startup).
    #[error("No playlists available")]
    NoPlaylists,

    /// The catalog collaborator failed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Server configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl WavesyncError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlaylistNotFound(_) => "playlist_not_found",
            Self::EmptyPlaylist(_) => "empty_playlist",
            Self::NoPlaylists => "no_playlists",
            Self::Catalog(_) => "catalog_error",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PlaylistNotFound(_) => StatusCode::NOT_FOUND,
            Self::EmptyPlaylist(_) => StatusCode::BAD_REQUEST,
            Self::NoPlaylists | Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Catalog(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type WavesyncResult<T> = Result<T, WavesyncError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for WavesyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<CatalogError> for WavesyncError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::PlaylistNotFound(id) => Self::PlaylistNotFound(id),
            other => Self::Catalog(other.to_string()),
        }
    }
}
