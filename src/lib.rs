//! find-dir-stream - Streaming Directory Walker
//!
//! Walks a directory tree like find(1), but instead of a flat list of paths
//! it produces one [`ListingEvent`] per directory: the directory's path and
//! the names of the entries it contains.
//!
//! # Features
//!
//! - **Pull-driven**: [`DirStream`] is a `futures::Stream`. Nothing happens
//!   between pulls, so a slow consumer is never flooded.
//!
//! - **Concurrent probing**: every entry of a listed directory is probed
//!   with stat concurrently, bounded by a configurable cap.
//!
//! - **Parent before child**: a directory's event is always produced before
//!   the events of any directory found inside it.
//!
//! - **Errors stay local**: a directory that cannot be listed, or an entry
//!   that cannot be probed, is logged and skipped; the rest of the tree is
//!   still walked.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Consumer                          │
//! │                 (stream.next().await)                    │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ pull            ▲ ListingEvent
//!                              ▼                 │
//! ┌──────────────────────────────────────────────────────────┐
//! │                       DirStream                          │
//! │  PendingQueue ──► listing ──► wave of probes ──┐         │
//! │       ▲                                        │         │
//! │       └──────────── subdirectories ◄───────────┘         │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ FileSystem trait
//!                              ▼
//!           ┌────────────────────────────────────┐
//!           │ LocalFileSystem / MemoryFileSystem │
//!           └────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! Streams over [`LocalFileSystem`] must be polled inside a tokio runtime.
//!
//! ```no_run
//! use find_dir_stream::create_traversal;
//! use futures::StreamExt;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut stream = create_traversal("/usr/share/doc");
//!     while let Some(event) = stream.next().await {
//!         println!("{}: {}", event.dir.display(), event.files.join(","));
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod fs;
pub mod progress;
pub mod walker;

pub use config::{CliArgs, OutputFormat, WalkConfig};
pub use error::{ConfigError, FsError, Result, WalkerError};
pub use fs::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use walker::{
    create_traversal, DirStream, ListingEvent, SchedulePolicy, TraversalOptions, TraversalStats,
};
