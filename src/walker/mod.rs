//! Traversal engine
//!
//! This module implements a pull-driven directory walker that lists one
//! directory at a time and probes every entry to discover subdirectories.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │        DirStream        │
//!                     │  - PendingQueue (FIFO)  │
//!                     │  - WaveTracker          │
//!                     └───────────┬─────────────┘
//!                                 │ consumer pull
//!                                 ▼
//!                     ┌─────────────────────────┐
//!                     │  list_directory(head)   │──► ListingEvent
//!                     └───────────┬─────────────┘
//!                                 │ one wave per directory
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │ stat e[0] │             │ stat e[1] │             │ stat e[N] │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └──────── directories appended to PendingQueue ─────┘
//! ```

pub mod options;
pub mod queue;
pub mod stream;
pub mod wave;

pub use options::{SchedulePolicy, TraversalOptions, DEFAULT_MAX_IN_FLIGHT_PROBES};
pub use queue::{DirTask, PendingQueue, QueueStats};
pub use stream::{create_traversal, DirStream, ListingEvent, TraversalStats};
pub use wave::{ProbeVerdict, SettledWave, WaveId, WaveTracker};
