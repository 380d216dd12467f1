//! Filesystem access layer
//!
//! The traversal engine talks to the filesystem through two asynchronous
//! capabilities, listing a directory and probing one entry, collected in the
//! [`FileSystem`] trait. Every call is one discrete operation; no handles are
//! kept open between calls.
//!
//! # Implementations
//!
//! ```text
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │       LocalFileSystem        │     │       MemoryFileSystem       │
//! │  - read_dir on blocking pool │     │  - builder-defined tree      │
//! │  - tokio::fs::metadata       │     │  - injected failures         │
//! │  - follows symlinks          │     │  - seeded completion jitter  │
//! └──────────────────────────────┘     └──────────────────────────────┘
//! ```

pub mod local;
pub mod memory;
pub mod types;

pub use local::LocalFileSystem;
pub use memory::{MemoryFileSystem, MemoryFileSystemBuilder};
pub use types::{EntryMetadata, EntryType};

use futures::future::BoxFuture;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Asynchronous filesystem capabilities consumed by the traversal engine.
///
/// Returned futures must not borrow from `self` or `path`; the engine keeps
/// many of them in flight at once.
pub trait FileSystem: Send + Sync + 'static {
    /// Lists the immediate entry names of `path`, in the order the backend
    /// returns them. `.` and `..` are never included. Names are returned as
    /// the platform gave them so child paths can be rebuilt exactly.
    fn list_directory(&self, path: &Path) -> BoxFuture<'static, io::Result<Vec<OsString>>>;

    /// Fetches metadata for a single entry.
    fn stat_entry(&self, path: &Path) -> BoxFuture<'static, io::Result<EntryMetadata>>;
}

/// Joins an entry name onto its parent directory using platform conventions.
pub fn join_entry(parent: &Path, name: &OsStr) -> PathBuf {
    parent.join(name)
}

/// Entry name as reported in listing events. Names that are not valid UTF-8
/// are converted lossily; the probe path is still built from the raw name.
pub fn display_name(parent: &Path, name: &OsStr) -> String {
    match name.to_str() {
        Some(name) => name.to_owned(),
        None => {
            trace!(path = %parent.display(), name = ?name, "Non UTF-8 entry name");
            name.to_string_lossy().into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_entry() {
        assert_eq!(join_entry(Path::new("/r"), OsStr::new("a")), PathBuf::from("/r/a"));
        assert_eq!(join_entry(Path::new("/"), OsStr::new("etc")), PathBuf::from("/etc"));
        assert_eq!(join_entry(Path::new("rel/dir"), OsStr::new("x")), PathBuf::from("rel/dir/x"));
    }

    #[test]
    fn test_display_name_utf8_passthrough() {
        assert_eq!(display_name(Path::new("/r"), OsStr::new("notes.md")), "notes.md");
    }

    #[cfg(unix)]
    #[test]
    fn test_display_name_lossy_keeps_raw_path() {
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"bad\xff");
        assert_eq!(display_name(Path::new("/r"), raw), "bad\u{FFFD}");

        let joined = join_entry(Path::new("/r"), raw);
        assert_eq!(joined.as_os_str().as_bytes(), b"/r/bad\xff");
    }
}
