//! Error type definitions for the playlist cleaner
//!
//! Per-probe failures are an expected condition of the domain and never
//! surface here; they are absorbed by the prober and counted by the
//! scheduler. The errors below are the ones the engine reports to its
//! caller.

use thiserror::Error;

/// Convenience result alias used throughout the library.
pub type SweepResult<T> = Result<T, SweepError>;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum SweepError {
    /// Source handling errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// I/O error while writing the cleaned playlist
    #[error("Write failed: {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Source handling specific errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Source path missing after resolution
    #[error("Source not found: {path}")]
    NotFound { path: String },

    /// URL cannot be parsed or its scheme is unsupported
    #[error("Invalid source URL: {url} - {message}")]
    InvalidUrl { url: String, message: String },

    /// Non-2xx status while downloading a source playlist
    #[error("Download failed: {url} - HTTP {status}")]
    DownloadFailed { url: String, status: u16 },
}

impl SweepError {
    /// Create a write failure for a specific output path.
    pub fn write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }
}

impl SourceError {
    /// Create a not found error for a source path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a download failure from an HTTP status.
    pub fn download_failed(url: impl Into<String>, status: u16) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            status,
        }
    }
}
