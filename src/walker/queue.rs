//! Pending directory queue
//!
//! FIFO of directories waiting to be listed. Owned by the stream and only
//! touched from its scheduler loop, so no synchronization is involved.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// A directory waiting to be listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTask {
    /// Full path to the directory
    pub path: PathBuf,

    /// Depth from root (0 = root); informational only
    pub depth: u32,
}

impl DirTask {
    /// Create a new directory task
    pub fn new(path: PathBuf, depth: u32) -> Self {
        Self { path, depth }
    }

    /// Create the root task
    pub fn root(path: PathBuf) -> Self {
        Self { path, depth: 0 }
    }
}

/// Statistics for the pending queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Total tasks enqueued, root included
    pub enqueued: u64,

    /// Total tasks dequeued
    pub dequeued: u64,

    /// Largest queue length observed
    pub peak_len: usize,
}

/// FIFO queue of directories awaiting listing
#[derive(Debug, Default)]
pub struct PendingQueue {
    tasks: VecDeque<DirTask>,
    stats: QueueStats,
}

impl PendingQueue {
    /// Create a queue seeded with the root directory
    pub fn seeded(root: &Path) -> Self {
        let mut queue = Self::default();
        queue.push(DirTask::root(root.to_path_buf()));
        queue
    }

    /// Append a task at the tail
    pub fn push(&mut self, task: DirTask) {
        self.tasks.push_back(task);
        self.stats.enqueued += 1;
        self.stats.peak_len = self.stats.peak_len.max(self.tasks.len());
    }

    /// Remove the task at the head
    pub fn pop(&mut self) -> Option<DirTask> {
        let task = self.tasks.pop_front()?;
        self.stats.dequeued += 1;
        Some(task)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }
}
