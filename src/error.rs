//! Error types for find-dir-stream
//!
//! This module defines the error hierarchy that covers:
//! - Filesystem errors raised while listing or probing entries
//! - Configuration and CLI errors
//! - Output errors in the demonstration binary
//!
//! Filesystem errors never end a traversal. The engine logs them and drops
//! the affected path, so `FsError` only shows up in log lines and tests.
//! `ConfigError` is reported by the binary through anyhow.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that end a run of the binary. Filesystem errors never do.
#[derive(Error, Debug)]
pub enum WalkerError {
    /// I/O errors (stdout, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON output failed
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Errors from the filesystem access layer, tagged with the operation
#[derive(Error, Debug)]
pub enum FsError {
    /// Directory listing failed; the directory is dropped
    #[error("Failed to list directory '{path}': {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Metadata probe failed; the entry is never treated as a directory
    #[error("Failed to stat '{path}': {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Path the failed operation was issued for
    pub fn path(&self) -> &Path {
        match self {
            FsError::Listing { path, .. } | FsError::Probe { path, .. } => path.as_path(),
        }
    }

    /// Underlying I/O error kind
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            FsError::Listing { source, .. } | FsError::Probe { source, .. } => source.kind(),
        }
    }

    /// Check if this error is an expected condition of a live filesystem
    /// (entry vanished, no permission, not a directory)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::NotFound
                | io::ErrorKind::PermissionDenied
                | io::ErrorKind::NotADirectory
        )
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Probe limit of zero would stall every wave
    #[error("Invalid probe limit {limit}: must be at least 1")]
    InvalidProbeLimit { limit: usize },

    /// Listing limit of zero would never start a listing
    #[error("Invalid listing limit {limit}: must be at least 1")]
    InvalidListingLimit { limit: usize },

    /// Invalid --match pattern
    #[error("Invalid match pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Root path is empty
    #[error("Root path must not be empty")]
    EmptyRoot,
}

/// Result type alias for WalkerError
pub type Result<T> = std::result::Result<T, WalkerError>;
