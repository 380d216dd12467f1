//! Local filesystem backed by tokio
//!
//! Listing runs `std::fs::read_dir` to completion on tokio's blocking pool so
//! one listing is one unit of work. Probes use `tokio::fs::metadata`, which
//! follows symlinks: a link to a directory is walked like the directory.
//!
//! Both operations hand work to tokio's blocking pool, so a stream over
//! [`LocalFileSystem`] must be polled from inside a tokio runtime. Polling it
//! from another executor panics.

use super::{EntryMetadata, FileSystem};
use futures::future::BoxFuture;
use std::ffi::OsString;
use std::io;
use std::path::Path;

/// The real filesystem.
///
/// Requires a tokio runtime (current-thread is enough) when its futures are
/// polled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn list_directory(&self, path: &Path) -> BoxFuture<'static, io::Result<Vec<OsString>>> {
        let path = path.to_path_buf();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || read_names(&path))
                .await
                .map_err(|e| io::Error::other(format!("listing task failed: {e}")))?
        })
    }

    fn stat_entry(&self, path: &Path) -> BoxFuture<'static, io::Result<EntryMetadata>> {
        let path = path.to_path_buf();
        Box::pin(async move {
            let meta = tokio::fs::metadata(&path).await?;
            Ok(EntryMetadata::from(&meta))
        })
    }
}

fn read_names(path: &Path) -> io::Result<Vec<OsString>> {
    std::fs::read_dir(path)?
        .map(|entry| entry.map(|entry| entry.file_name()))
        .collect()
}
