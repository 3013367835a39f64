//! Error type definitions for the face collection loader
//!
//! Every stage of the fetch pipeline reports through [`FetchError`]. There
//! are no retries anywhere: the first error aborts the call and is returned
//! to the caller unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while locating, fetching, converting, caching or
/// normalizing the face collection.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The cache directory or artifact could not be created or accessed
    #[error("Filesystem error: {path:?} - {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Remote retrieval failed (only reachable when a download was attempted)
    #[error("Fetch failed: {url} - {message}")]
    Fetch { url: String, message: String },

    /// No cached artifact and downloading was disallowed
    #[error("Data not found at {path:?} and downloading is disabled")]
    MissingData { path: PathBuf },

    /// Archive bytes do not match the expected container layout
    #[error("Format error: {reason}")]
    Format { reason: String },

    /// The cached artifact exists but cannot be decoded
    #[error("Corrupt cache: {path:?} - {reason}")]
    CorruptCache { path: PathBuf, reason: String },

    /// Every raw value is identical, so min-max scaling is undefined
    #[error("Degenerate input: all {count} raw values equal {value}")]
    DegenerateInput { count: usize, value: f64 },

    /// Invalid option or configuration value
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The blocking pipeline task did not complete
    #[error("Background task failed: {message}")]
    Join { message: String },
}

impl FetchError {
    /// Create a filesystem error for `path`
    pub fn filesystem<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Create a fetch error for `url`
    pub fn fetch<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a format error
    pub fn format<S: Into<String>>(reason: S) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }

    /// Create a corrupt cache error for `path`
    pub fn corrupt_cache<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::CorruptCache {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True if this error came out of the network layer
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// True if the artifact was missing and downloading was disabled
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingData { .. })
    }
}
