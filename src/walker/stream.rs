//! Directory listing stream - the traversal engine
//!
//! `DirStream` is a [`Stream`] of [`ListingEvent`]s, one per successfully
//! listed directory. Every in-flight listing and probe is a future owned by
//! the stream and polled from `poll_next`, so all state changes happen on the
//! consumer's task and nothing runs between pulls.
//!
//! Each pull runs the scheduler loop:
//!
//! ```text
//! poll_next
//!   │
//!   ├── drain completed probes ──► enqueue subdirectories, settle waves
//!   ├── completed listing? ──────► open wave of probes, return event
//!   └── readiness check
//!         ├── work outstanding ──► Pending
//!         ├── queue non-empty ───► dequeue head, issue listing, loop
//!         └── nothing left ──────► end-of-stream (once)
//! ```
//!
//! A directory's event is always returned before any of its children are
//! enqueued, which gives the parent-before-child ordering. Any other
//! relative order of events is unspecified.

use super::options::{SchedulePolicy, TraversalOptions};
use super::queue::{DirTask, PendingQueue, QueueStats};
use super::wave::{ProbeVerdict, WaveId, WaveTracker};
use crate::error::FsError;
use crate::fs::{display_name, join_entry, EntryMetadata, FileSystem, LocalFileSystem};
use futures::future::BoxFuture;
use futures::stream::{FusedStream, FuturesUnordered, Stream, StreamExt};
use serde::{Serialize, Serializer};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, error, info, trace, warn};

/// One listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEvent {
    /// Directory path, as the root was given plus joined entry names
    #[serde(serialize_with = "serialize_lossy")]
    pub dir: PathBuf,

    /// Entry names in listing order, lossily converted to UTF-8
    pub files: Vec<String>,
}

fn serialize_lossy<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// Counters collected during a traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub listings_issued: u64,
    pub listings_failed: u64,
    pub probes_issued: u64,
    pub probes_failed: u64,
    /// Directories discovered by probes (the root is not counted)
    pub dirs_enqueued: u64,
    pub events_emitted: u64,
    pub waves_settled: u64,
}

struct ListingOutcome {
    task: DirTask,
    result: io::Result<Vec<OsString>>,
}

struct ProbeTask {
    wave: WaveId,
    path: PathBuf,
    depth: u32,
}

struct ProbeOutcome {
    task: ProbeTask,
    result: io::Result<EntryMetadata>,
}

enum Readiness {
    Wait,
    Launch,
    Finished,
}

/// Start a traversal of `root` on the local filesystem with default options.
///
/// The root is not checked up front; if it cannot be listed the stream
/// simply ends without events.
///
/// The returned stream must be polled inside a tokio runtime because
/// [`LocalFileSystem`] runs its I/O on tokio's blocking pool. Polling it from
/// another executor panics.
pub fn create_traversal(root: impl AsRef<Path>) -> DirStream<LocalFileSystem> {
    DirStream::new(root, Arc::new(LocalFileSystem::new()), TraversalOptions::default())
}

/// Pull-driven traversal engine
#[must_use = "streams do nothing unless polled"]
pub struct DirStream<F: FileSystem = LocalFileSystem> {
    fs: Arc<F>,
    root: PathBuf,
    options: TraversalOptions,
    pending: PendingQueue,
    listings: FuturesUnordered<BoxFuture<'static, ListingOutcome>>,
    probes: FuturesUnordered<BoxFuture<'static, ProbeOutcome>>,
    /// Probes waiting for a slot under the probe cap
    backlog: VecDeque<ProbeTask>,
    waves: WaveTracker,
    stats: TraversalStats,
    finished: bool,
}

impl<F: FileSystem> DirStream<F> {
    /// Create a traversal of `root` over `fs`
    pub fn new(root: impl AsRef<Path>, fs: Arc<F>, options: TraversalOptions) -> Self {
        let root = root.as_ref().to_path_buf();
        debug!(root = %root.display(), ?options, "Traversal created");

        Self {
            fs,
            pending: PendingQueue::seeded(&root),
            root,
            options,
            listings: FuturesUnordered::new(),
            probes: FuturesUnordered::new(),
            backlog: VecDeque::new(),
            waves: WaveTracker::new(),
            stats: TraversalStats::default(),
            finished: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    pub fn stats(&self) -> TraversalStats {
        self.stats
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.pending.stats()
    }

    /// Directories waiting to be listed
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Listings issued but not yet completed
    pub fn outstanding_listings(&self) -> usize {
        self.listings.len()
    }

    /// Probes not yet completed, including those held back by the probe cap
    pub fn outstanding_probes(&self) -> usize {
        self.waves.outstanding()
    }

    /// Directories whose probes have not all completed
    pub fn open_waves(&self) -> usize {
        self.waves.open_waves()
    }

    /// True once end-of-stream has been returned
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn readiness(&self) -> Readiness {
        let probing = !self.waves.is_idle();
        let listing = !self.listings.is_empty();

        match self.options.policy {
            SchedulePolicy::GlobalBarrier => {
                if probing || listing {
                    Readiness::Wait
                } else if !self.pending.is_empty() {
                    Readiness::Launch
                } else {
                    Readiness::Finished
                }
            }
            SchedulePolicy::Overlapped { max_listings } => {
                if !self.pending.is_empty() && self.listings.len() < max_listings.max(1) {
                    Readiness::Launch
                } else if probing || listing || !self.pending.is_empty() {
                    Readiness::Wait
                } else {
                    Readiness::Finished
                }
            }
        }
    }

    fn launch_listing(&mut self, task: DirTask) {
        debug!(path = %task.path.display(), depth = task.depth, "Listing directory");
        self.stats.listings_issued += 1;

        let listing = self.fs.list_directory(&task.path);
        self.listings.push(Box::pin(async move {
            ListingOutcome {
                result: listing.await,
                task,
            }
        }));
    }

    fn open_wave(&mut self, task: &DirTask, names: &[OsString]) {
        let Some(wave) = self.waves.open(&task.path, names.len()) else {
            return;
        };

        let depth = task.depth + 1;
        self.backlog.extend(names.iter().map(|name| ProbeTask {
            wave,
            path: join_entry(&task.path, name),
            depth,
        }));
        self.launch_probes();
    }

    fn launch_probes(&mut self) {
        let cap = self.options.probe_cap();
        while self.probes.len() < cap {
            let Some(task) = self.backlog.pop_front() else {
                break;
            };
            self.stats.probes_issued += 1;

            let probe = self.fs.stat_entry(&task.path);
            self.probes.push(Box::pin(async move {
                ProbeOutcome {
                    result: probe.await,
                    task,
                }
            }));
        }
    }

    fn settle_probe(&mut self, outcome: ProbeOutcome) {
        let ProbeOutcome { task, result } = outcome;

        let verdict = match result {
            Ok(meta) if meta.is_dir() => {
                trace!(path = %task.path.display(), "Discovered directory");
                self.pending.push(DirTask::new(task.path, task.depth));
                self.stats.dirs_enqueued += 1;
                ProbeVerdict::Directory
            }
            Ok(_) => ProbeVerdict::NotDirectory,
            Err(source) => {
                self.stats.probes_failed += 1;
                log_dropped(&FsError::Probe {
                    path: task.path,
                    source,
                });
                ProbeVerdict::Failed
            }
        };

        if let Some(settled) = self.waves.record(task.wave, verdict) {
            self.stats.waves_settled += 1;
            debug!(
                dir = %settled.dir.display(),
                probed = settled.probed,
                subdirs = settled.subdirs,
                failures = settled.failures,
                "Wave settled"
            );
        }
    }

    /// Poll probes until none is ready, refilling slots as they free up
    fn drain_probes(&mut self, cx: &mut Context<'_>) {
        loop {
            self.launch_probes();
            match self.probes.poll_next_unpin(cx) {
                Poll::Ready(Some(outcome)) => self.settle_probe(outcome),
                Poll::Ready(None) | Poll::Pending => break,
            }
        }
    }

    /// Return the next successfully listed directory, dropping failed ones
    fn poll_listings(&mut self, cx: &mut Context<'_>) -> Option<ListingEvent> {
        while let Poll::Ready(Some(outcome)) = self.listings.poll_next_unpin(cx) {
            let ListingOutcome { task, result } = outcome;
            match result {
                Ok(names) => {
                    trace!(path = %task.path.display(), entries = names.len(), "Listed directory");
                    self.open_wave(&task, &names);
                    let files = names.iter().map(|name| display_name(&task.path, name)).collect();
                    self.stats.events_emitted += 1;
                    return Some(ListingEvent {
                        dir: task.path,
                        files,
                    });
                }
                Err(source) => {
                    self.stats.listings_failed += 1;
                    log_dropped(&FsError::Listing {
                        path: task.path,
                        source,
                    });
                }
            }
        }
        None
    }

    fn finish(&mut self) {
        debug_assert!(self.pending.is_empty());
        debug_assert!(self.listings.is_empty() && self.probes.is_empty());
        debug_assert!(self.backlog.is_empty() && self.waves.is_idle());

        self.finished = true;
        info!(
            root = %self.root.display(),
            dirs = self.stats.events_emitted,
            entries = self.stats.probes_issued,
            listing_errors = self.stats.listings_failed,
            probe_errors = self.stats.probes_failed,
            "Traversal complete"
        );
    }
}

fn log_dropped(err: &FsError) {
    if err.is_recoverable() {
        warn!(error = %err, "Skipping path");
    } else {
        error!(error = %err, "Skipping path");
    }
}

impl<F: FileSystem> Stream for DirStream<F> {
    type Item = ListingEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            this.drain_probes(cx);

            if let Some(event) = this.poll_listings(cx) {
                return Poll::Ready(Some(event));
            }

            match this.readiness() {
                Readiness::Wait => return Poll::Pending,
                Readiness::Launch => {
                    if let Some(task) = this.pending.pop() {
                        this.launch_listing(task);
                    }
                }
                Readiness::Finished => {
                    this.finish();
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl<F: FileSystem> FusedStream for DirStream<F> {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

impl<F: FileSystem> fmt::Debug for DirStream<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirStream")
            .field("root", &self.root)
            .field("options", &self.options)
            .field("pending", &self.pending.len())
            .field("outstanding_listings", &self.listings.len())
            .field("outstanding_probes", &self.waves.outstanding())
            .field("stats", &self.stats)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use std::collections::HashMap;

    fn example_fs() -> MemoryFileSystem {
        MemoryFileSystem::builder().dir("/r/a").file("/r/b/f", 1).build()
    }

    /// Three levels, mixed files and directories, some empty directories
    fn deep_fs(seed: u64) -> MemoryFileSystem {
        MemoryFileSystem::builder()
            .file("/r/readme", 10)
            .dir("/r/empty")
            .file("/r/src/main.rs", 100)
            .file("/r/src/lib.rs", 200)
            .dir("/r/src/walker/tests")
            .file("/r/src/walker/queue.rs", 50)
            .file("/r/docs/guide/intro.md", 5)
            .dir("/r/docs/guide/img")
            .file("/r/docs/api.md", 7)
            .dir("/r/target/debug/deps")
            .jitter(seed, 6)
            .build()
    }

    async fn walk(fs: MemoryFileSystem, options: TraversalOptions) -> (Vec<ListingEvent>, Arc<MemoryFileSystem>) {
        let fs = Arc::new(fs);
        let stream = DirStream::new("/r", Arc::clone(&fs), options);
        let events = stream.collect::<Vec<_>>().await;
        (events, fs)
    }

    fn assert_parent_before_child(events: &[ListingEvent]) {
        let index: HashMap<&Path, usize> =
            events.iter().enumerate().map(|(i, e)| (e.dir.as_path(), i)).collect();
        for (i, event) in events.iter().enumerate() {
            if let Some(parent_idx) = event.dir.parent().and_then(|p| index.get(p)) {
                assert!(
                    *parent_idx < i,
                    "{} emitted before its parent",
                    event.dir.display()
                );
            }
        }
    }

    fn assert_complete(events: &[ListingEvent], fs: &MemoryFileSystem) {
        let mut dirs: Vec<PathBuf> = events.iter().map(|e| e.dir.clone()).collect();
        dirs.sort();
        assert_eq!(dirs, fs.directories_under(Path::new("/r")));

        for event in events {
            assert_eq!(Some(event.files.as_slice()), fs.children(&event.dir));
        }
    }

    #[tokio::test]
    async fn test_example_tree() {
        let (events, _fs) = walk(example_fs(), TraversalOptions::default()).await;

        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            ListingEvent {
                dir: PathBuf::from("/r"),
                files: vec!["a".into(), "b".into()],
            }
        );

        let mut rest = events[1..].to_vec();
        rest.sort_by(|a, b| a.dir.cmp(&b.dir));
        assert_eq!(
            rest,
            vec![
                ListingEvent {
                    dir: PathBuf::from("/r/a"),
                    files: vec![],
                },
                ListingEvent {
                    dir: PathBuf::from("/r/b"),
                    files: vec!["f".into()],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_completeness_and_ordering_across_seeds() {
        for seed in 0..16 {
            let (events, fs) = walk(deep_fs(seed), TraversalOptions::default()).await;
            assert_complete(&events, &fs);
            assert_parent_before_child(&events);
        }
    }

    #[tokio::test]
    async fn test_termination_counts() {
        let fs = Arc::new(deep_fs(3));
        let dirs = fs.directories_under(Path::new("/r")).len();
        let entries = fs.entries_under(Path::new("/r"));

        let mut stream = DirStream::new("/r", Arc::clone(&fs), TraversalOptions::default());
        let mut count = 0;
        while let Some(_event) = stream.next().await {
            count += 1;
        }

        assert_eq!(count, dirs);
        assert_eq!(fs.listing_calls(), dirs);
        assert_eq!(fs.probe_calls(), entries);

        let stats = stream.stats();
        assert_eq!(stats.listings_issued, dirs as u64);
        assert_eq!(stats.probes_issued, entries as u64);
        assert_eq!(stats.events_emitted, dirs as u64);
        assert_eq!(stats.dirs_enqueued, dirs as u64 - 1);

        assert!(stream.is_finished());
        assert!(stream.is_terminated());
        assert_eq!(stream.pending_len(), 0);
        assert_eq!(stream.outstanding_listings(), 0);
        assert_eq!(stream.outstanding_probes(), 0);
        assert_eq!(stream.open_waves(), 0);

        // End-of-stream is sticky and does no further work
        assert!(stream.next().await.is_none());
        assert_eq!(fs.listing_calls(), dirs);
    }

    #[tokio::test]
    async fn test_listing_error_isolation() {
        let fs = MemoryFileSystem::builder()
            .dir("/r/a/x")
            .file("/r/b/c/deep", 1)
            .file("/r/z", 1)
            .fail_listing("/r/b", io::ErrorKind::PermissionDenied)
            .jitter(11, 4)
            .build();

        let (events, fs) = walk(fs, TraversalOptions::default()).await;
        let mut dirs: Vec<PathBuf> = events.iter().map(|e| e.dir.clone()).collect();
        dirs.sort();

        assert_eq!(
            dirs,
            vec![PathBuf::from("/r"), PathBuf::from("/r/a"), PathBuf::from("/r/a/x")]
        );
        assert!(!fs.listed_paths().contains(&PathBuf::from("/r/b/c")));
    }

    #[tokio::test]
    async fn test_listing_error_isolation_with_overlap() {
        let options = TraversalOptions::default()
            .with_policy(SchedulePolicy::Overlapped { max_listings: 3 });

        for seed in 0..16 {
            let fs = MemoryFileSystem::builder()
                .dir("/r/a/x")
                .dir("/r/a/y")
                .file("/r/b/c/deep", 1)
                .dir("/r/d/e")
                .file("/r/z", 1)
                .fail_listing("/r/b", io::ErrorKind::PermissionDenied)
                .fail_listing("/r/a/y", io::ErrorKind::Other)
                .jitter(seed, 4)
                .build();
            let fs = Arc::new(fs);

            let mut stream = DirStream::new("/r", Arc::clone(&fs), options);
            let mut dirs = Vec::new();
            while let Some(event) = stream.next().await {
                dirs.push(event.dir);
            }
            dirs.sort();

            assert_eq!(
                dirs,
                vec![
                    PathBuf::from("/r"),
                    PathBuf::from("/r/a"),
                    PathBuf::from("/r/a/x"),
                    PathBuf::from("/r/d"),
                    PathBuf::from("/r/d/e"),
                ]
            );
            assert!(fs.peak_concurrent_listings() <= 3);

            let stats = stream.stats();
            assert_eq!(stats.listings_failed, 2);
            assert_eq!(stats.listings_issued, 7);
            assert!(stream.is_terminated());
            assert_eq!(stream.outstanding_listings(), 0);
            assert_eq!(stream.outstanding_probes(), 0);

            assert!(stream.next().await.is_none());
            assert_eq!(fs.listing_calls(), 7);
        }
    }

    #[tokio::test]
    async fn test_probe_error_keeps_name_in_listing() {
        let fs = MemoryFileSystem::builder()
            .dir("/r/ok")
            .dir("/r/flaky/child")
            .fail_probe("/r/flaky", io::ErrorKind::NotFound)
            .build();

        let fs = Arc::new(fs);
        let mut stream = DirStream::new("/r", Arc::clone(&fs), TraversalOptions::default());
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }

        assert_eq!(events[0].files, vec!["ok".to_string(), "flaky".to_string()]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].dir, PathBuf::from("/r/ok"));
        assert_eq!(stream.stats().probes_failed, 1);
    }

    #[tokio::test]
    async fn test_missing_root_ends_stream() {
        let fs = Arc::new(MemoryFileSystem::builder().dir("/elsewhere").build());
        let mut stream = DirStream::new("/r", Arc::clone(&fs), TraversalOptions::default());

        assert!(stream.next().await.is_none());
        assert_eq!(stream.stats().listings_failed, 1);
        assert_eq!(stream.stats().events_emitted, 0);
        assert_eq!(fs.listing_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_root_emits_one_event() {
        let (events, fs) = walk(MemoryFileSystem::builder().dir("/r").build(), TraversalOptions::default()).await;
        assert_eq!(
            events,
            vec![ListingEvent {
                dir: PathBuf::from("/r"),
                files: vec![],
            }]
        );
        assert_eq!(fs.probe_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_progress_without_pulls() {
        let fs = Arc::new(example_fs());
        let mut stream = DirStream::new("/r", Arc::clone(&fs), TraversalOptions::default());

        let first = stream.next().await.unwrap();
        assert_eq!(first.dir, PathBuf::from("/r"));

        for _ in 0..32 {
            tokio::task::yield_now().await;
        }

        assert_eq!(stream.stats().events_emitted, 1);
        assert_eq!(fs.listing_calls(), 1);
        assert_eq!(stream.outstanding_probes(), 2);
        assert_eq!(stream.pending_len(), 0);

        let rest = stream.collect::<Vec<_>>().await;
        assert_eq!(rest.len(), 2);
    }

    #[tokio::test]
    async fn test_global_barrier_serializes_listings() {
        for seed in 0..8 {
            let (events, fs) = walk(deep_fs(seed), TraversalOptions::default()).await;
            assert_complete(&events, &fs);
            assert_eq!(fs.peak_concurrent_listings(), 1);
            assert_eq!(fs.listings_while_probing(), 0);
        }
    }

    #[tokio::test]
    async fn test_overlapped_policy() {
        let options = TraversalOptions::default()
            .with_policy(SchedulePolicy::Overlapped { max_listings: 3 });

        for seed in 0..16 {
            let (events, fs) = walk(deep_fs(seed), options).await;
            assert_complete(&events, &fs);
            assert_parent_before_child(&events);
            assert!(fs.peak_concurrent_listings() <= 3);
        }
    }

    #[tokio::test]
    async fn test_probe_cap_bounds_fan_out() {
        let mut builder = MemoryFileSystem::builder();
        for i in 0..10 {
            builder = builder.dir(format!("/r/d{i}"));
        }
        let options = TraversalOptions::default().with_probe_limit(Some(2));

        let (events, fs) = walk(builder.jitter(5, 3).build(), options).await;
        assert_eq!(events.len(), 11);
        assert_eq!(fs.probe_calls(), 10);
        assert!(fs.peak_concurrent_probes() <= 2);
    }

    #[tokio::test]
    async fn test_unbounded_probes_issue_whole_wave() {
        let mut builder = MemoryFileSystem::builder();
        for i in 0..10 {
            builder = builder.file(format!("/r/f{i}"), i);
        }

        let (events, fs) = walk(builder.build(), TraversalOptions::unbounded()).await;
        assert_eq!(events.len(), 1);
        assert_eq!(fs.peak_concurrent_probes(), 10);
    }

    #[tokio::test]
    async fn test_waves_settled_per_non_empty_directory() {
        let fs = Arc::new(example_fs());
        let mut stream = DirStream::new("/r", Arc::clone(&fs), TraversalOptions::default());
        while stream.next().await.is_some() {}

        // /r and /r/b have entries, /r/a is empty
        assert_eq!(stream.stats().waves_settled, 2);
        assert_eq!(stream.queue_stats().enqueued, 3);
        assert_eq!(stream.queue_stats().dequeued, 3);
    }
}
