//! Error types for the capiscio wrapper
//!
//! All modules use `CapiscioResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for wrapper operations
pub type CapiscioResult<T> = Result<T, CapiscioError>;

/// All errors that can occur in the wrapper
#[derive(Error, Debug)]
pub enum CapiscioError {
    // Platform errors
    #[error("Unsupported platform: {os}/{arch}. No capiscio-core build is published for it.")]
    UnsupportedPlatform { os: String, arch: String },

    // Cache errors
    #[error("Could not determine a user cache directory")]
    CacheDirUnavailable,

    #[error("Failed to remove cache directory {path}: {source}")]
    CacheClean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Download errors
    #[error("Could not fetch {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("No capiscio-core v{version} artifact published for {target}")]
    ArtifactMissing { version: String, target: String },

    #[error("Downloaded artifact is empty: {url}")]
    EmptyArtifact { url: String },

    #[error("Checksum mismatch for {artifact}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },

    // Process errors
    #[error("Failed to launch {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CapiscioError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Download { .. } => Some("Check your network connection and re-run the command."),
            Self::ArtifactMissing { .. } => {
                Some("See https://github.com/capiscio/capiscio-core/releases for published targets.")
            }
            Self::Spawn { .. } | Self::ChecksumMismatch { .. } => {
                Some("Run: capiscio --wrapper-clean, then re-run to fetch a fresh binary.")
            }
            _ => None,
        }
    }
}
