//! In-memory filesystem for deterministic traversal tests
//!
//! Trees are described with [`MemoryFileSystemBuilder`]. Adding a path creates
//! its missing ancestors (like `mkdir -p`) and appends the name to the
//! parent's listing, so listing order is insertion order.
//!
//! Two knobs make the engine's concurrency observable:
//! - **Failures**: listing or probing a given path returns a chosen
//!   `io::ErrorKind`.
//! - **Jitter**: each call yields to the executor a seeded, path-dependent
//!   number of times before completing, so sibling completions arrive out of
//!   issue order while staying reproducible.
//!
//! Calls are counted when issued, not when polled.

use super::{EntryMetadata, FileSystem};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Node {
    Dir(Vec<String>),
    File(u64),
}

#[derive(Debug, Clone, Copy)]
struct Jitter {
    seed: u64,
    max_yields: u32,
}

impl Jitter {
    fn yields_for(&self, op: u8, path: &Path) -> u32 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        op.hash(&mut hasher);
        path.hash(&mut hasher);
        (hasher.finish() % (self.max_yields as u64 + 1)) as u32
    }
}

/// Call bookkeeping shared with in-flight futures
#[derive(Debug, Default)]
struct CallCounters {
    listings: AtomicUsize,
    probes: AtomicUsize,
    active_probes: AtomicUsize,
    peak_probes: AtomicUsize,
    active_listings: AtomicUsize,
    peak_listings: AtomicUsize,
    listings_while_probing: AtomicUsize,
    listed: Mutex<Vec<PathBuf>>,
}

impl CallCounters {
    fn listing_started(&self, path: &Path) {
        self.listings.fetch_add(1, Ordering::Relaxed);
        if self.active_probes.load(Ordering::Relaxed) > 0 {
            self.listings_while_probing.fetch_add(1, Ordering::Relaxed);
        }
        let active = self.active_listings.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_listings.fetch_max(active, Ordering::Relaxed);
        self.listed.lock().push(path.to_path_buf());
    }

    fn probe_started(&self) {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let active = self.active_probes.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_probes.fetch_max(active, Ordering::Relaxed);
    }
}

/// Decrements the active count however the call's future ends
struct ActiveCall {
    counters: Arc<CallCounters>,
    probe: bool,
}

impl Drop for ActiveCall {
    fn drop(&mut self) {
        let active = if self.probe {
            &self.counters.active_probes
        } else {
            &self.counters.active_listings
        };
        active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Builder for [`MemoryFileSystem`]
#[derive(Debug, Default)]
pub struct MemoryFileSystemBuilder {
    nodes: HashMap<PathBuf, Node>,
    listing_failures: HashMap<PathBuf, io::ErrorKind>,
    probe_failures: HashMap<PathBuf, io::ErrorKind>,
    jitter: Option<Jitter>,
}

impl MemoryFileSystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory (and its ancestors)
    pub fn dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), Node::Dir(Vec::new()));
        self
    }

    /// Add a regular file of `size` bytes (and its ancestors)
    pub fn file(mut self, path: impl AsRef<Path>, size: u64) -> Self {
        self.insert(path.as_ref(), Node::File(size));
        self
    }

    /// Make listing `path` fail with `kind`
    pub fn fail_listing(mut self, path: impl AsRef<Path>, kind: io::ErrorKind) -> Self {
        self.listing_failures.insert(path.as_ref().to_path_buf(), kind);
        self
    }

    /// Make probing `path` fail with `kind`
    pub fn fail_probe(mut self, path: impl AsRef<Path>, kind: io::ErrorKind) -> Self {
        self.probe_failures.insert(path.as_ref().to_path_buf(), kind);
        self
    }

    /// Delay every completion by up to `max_yields` executor yields
    pub fn jitter(mut self, seed: u64, max_yields: u32) -> Self {
        self.jitter = Some(Jitter { seed, max_yields });
        self
    }

    pub fn build(self) -> MemoryFileSystem {
        MemoryFileSystem {
            nodes: self.nodes,
            listing_failures: self.listing_failures,
            probe_failures: self.probe_failures,
            jitter: self.jitter,
            counters: Arc::new(CallCounters::default()),
        }
    }

    fn insert(&mut self, path: &Path, node: Node) {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !self.nodes.contains_key(parent) {
                self.insert(parent, Node::Dir(Vec::new()));
            }
            if let (Some(name), Some(Node::Dir(children))) =
                (path.file_name(), self.nodes.get_mut(parent))
            {
                let name = name.to_string_lossy().into_owned();
                if !children.contains(&name) {
                    children.push(name);
                }
            }
        }
        self.nodes.entry(path.to_path_buf()).or_insert(node);
    }
}

/// Deterministic in-memory [`FileSystem`]
#[derive(Debug)]
pub struct MemoryFileSystem {
    nodes: HashMap<PathBuf, Node>,
    listing_failures: HashMap<PathBuf, io::ErrorKind>,
    probe_failures: HashMap<PathBuf, io::ErrorKind>,
    jitter: Option<Jitter>,
    counters: Arc<CallCounters>,
}

impl MemoryFileSystem {
    pub fn builder() -> MemoryFileSystemBuilder {
        MemoryFileSystemBuilder::new()
    }

    /// Number of listing calls issued so far
    pub fn listing_calls(&self) -> usize {
        self.counters.listings.load(Ordering::Relaxed)
    }

    /// Number of probe calls issued so far
    pub fn probe_calls(&self) -> usize {
        self.counters.probes.load(Ordering::Relaxed)
    }

    /// Highest number of probes that were issued but not yet finished
    pub fn peak_concurrent_probes(&self) -> usize {
        self.counters.peak_probes.load(Ordering::Relaxed)
    }

    /// Highest number of listings that were issued but not yet finished
    pub fn peak_concurrent_listings(&self) -> usize {
        self.counters.peak_listings.load(Ordering::Relaxed)
    }

    /// Listings issued while at least one probe was still unfinished
    pub fn listings_while_probing(&self) -> usize {
        self.counters.listings_while_probing.load(Ordering::Relaxed)
    }

    /// Paths passed to `list_directory`, in call order
    pub fn listed_paths(&self) -> Vec<PathBuf> {
        self.counters.listed.lock().clone()
    }

    /// All directories in the tree at or below `root`
    pub fn directories_under(&self, root: &Path) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .nodes
            .iter()
            .filter(|(path, node)| matches!(node, Node::Dir(_)) && path.starts_with(root))
            .map(|(path, _)| path.clone())
            .collect();
        dirs.sort();
        dirs
    }

    /// Entry names of a directory, as a listing would return them
    pub fn children(&self, path: &Path) -> Option<&[String]> {
        match self.nodes.get(path)? {
            Node::Dir(children) => Some(children),
            Node::File(_) => None,
        }
    }

    /// Total number of entries across all directories at or below `root`
    pub fn entries_under(&self, root: &Path) -> usize {
        self.nodes
            .iter()
            .filter(|(path, _)| path.starts_with(root))
            .map(|(_, node)| match node {
                Node::Dir(children) => children.len(),
                Node::File(_) => 0,
            })
            .sum()
    }

    fn delay(&self, op: u8, path: &Path) -> u32 {
        self.jitter.map(|j| j.yields_for(op, path)).unwrap_or(0)
    }
}

async fn yield_times(n: u32) {
    for _ in 0..n {
        tokio::task::yield_now().await;
    }
}

impl FileSystem for MemoryFileSystem {
    fn list_directory(&self, path: &Path) -> BoxFuture<'static, io::Result<Vec<OsString>>> {
        self.counters.listing_started(path);
        let active = ActiveCall {
            counters: Arc::clone(&self.counters),
            probe: false,
        };

        let result = match (self.listing_failures.get(path), self.nodes.get(path)) {
            (Some(kind), _) => Err(io::Error::from(*kind)),
            (None, Some(Node::Dir(children))) => Ok(children.iter().map(OsString::from).collect()),
            (None, Some(Node::File(_))) => Err(io::Error::from(io::ErrorKind::NotADirectory)),
            (None, None) => Err(io::Error::from(io::ErrorKind::NotFound)),
        };
        let yields = self.delay(0, path);

        Box::pin(async move {
            yield_times(yields).await;
            drop(active);
            result
        })
    }

    fn stat_entry(&self, path: &Path) -> BoxFuture<'static, io::Result<EntryMetadata>> {
        self.counters.probe_started();
        let active = ActiveCall {
            counters: Arc::clone(&self.counters),
            probe: true,
        };

        let result = match (self.probe_failures.get(path), self.nodes.get(path)) {
            (Some(kind), _) => Err(io::Error::from(*kind)),
            (None, Some(Node::Dir(_))) => Ok(EntryMetadata::directory()),
            (None, Some(Node::File(size))) => Ok(EntryMetadata::file(*size)),
            (None, None) => Err(io::Error::from(io::ErrorKind::NotFound)),
        };
        let yields = self.delay(1, path);

        Box::pin(async move {
            yield_times(yields).await;
            drop(active);
            result
        })
    }
}
