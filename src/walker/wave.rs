//! Per-directory probe completion tracking
//!
//! A wave is the set of probes launched for one directory's entries. Each
//! wave counts its own outstanding probes, so settlement is decided per
//! directory rather than by a single shared counter hitting zero. The
//! global barrier is then simply "no open waves".

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Identifier of an open wave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaveId(u64);

/// How a single probe ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// Entry is a directory and was enqueued
    Directory,
    /// Entry exists but is not a directory
    NotDirectory,
    /// Probe failed; entry dropped
    Failed,
}

#[derive(Debug)]
struct Wave {
    dir: PathBuf,
    remaining: usize,
    probed: usize,
    subdirs: usize,
    failures: usize,
}

/// Summary of a wave whose probes have all completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledWave {
    pub dir: PathBuf,
    pub probed: usize,
    pub subdirs: usize,
    pub failures: usize,
}

/// Tracks outstanding probes grouped by the directory that launched them
#[derive(Debug, Default)]
pub struct WaveTracker {
    next_id: u64,
    open: HashMap<WaveId, Wave>,
    outstanding: usize,
}

impl WaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a wave of `probes` probes for `dir`.
    ///
    /// Returns `None` for an empty directory: there is nothing to wait for.
    pub fn open(&mut self, dir: &Path, probes: usize) -> Option<WaveId> {
        if probes == 0 {
            return None;
        }

        let id = WaveId(self.next_id);
        self.next_id += 1;
        self.open.insert(
            id,
            Wave {
                dir: dir.to_path_buf(),
                remaining: probes,
                probed: 0,
                subdirs: 0,
                failures: 0,
            },
        );
        self.outstanding += probes;
        Some(id)
    }

    /// Record one completed probe. Returns the wave summary when this was
    /// the wave's last outstanding probe.
    pub fn record(&mut self, id: WaveId, verdict: ProbeVerdict) -> Option<SettledWave> {
        let wave = self.open.get_mut(&id)?;
        debug_assert!(wave.remaining > 0);

        wave.remaining -= 1;
        wave.probed += 1;
        self.outstanding -= 1;
        match verdict {
            ProbeVerdict::Directory => wave.subdirs += 1,
            ProbeVerdict::NotDirectory => {}
            ProbeVerdict::Failed => wave.failures += 1,
        }

        if wave.remaining > 0 {
            return None;
        }

        self.open.remove(&id).map(|wave| SettledWave {
            dir: wave.dir,
            probed: wave.probed,
            subdirs: wave.subdirs,
            failures: wave.failures,
        })
    }

    /// True when no wave has outstanding probes
    pub fn is_idle(&self) -> bool {
        self.open.is_empty()
    }

    /// Number of waves with outstanding probes
    pub fn open_waves(&self) -> usize {
        self.open.len()
    }

    /// Outstanding probes across all waves
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_directory_opens_no_wave() {
        let mut waves = WaveTracker::new();
        assert!(waves.open(Path::new("/r/empty"), 0).is_none());
        assert!(waves.is_idle());
        assert_eq!(waves.outstanding(), 0);
    }

    #[test]
    fn test_wave_settles_on_last_probe() {
        let mut waves = WaveTracker::new();
        let id = waves.open(Path::new("/r"), 3).unwrap();
        assert_eq!(waves.outstanding(), 3);

        assert!(waves.record(id, ProbeVerdict::Directory).is_none());
        assert!(waves.record(id, ProbeVerdict::Failed).is_none());
        assert!(!waves.is_idle());

        let settled = waves.record(id, ProbeVerdict::NotDirectory).unwrap();
        assert_eq!(
            settled,
            SettledWave {
                dir: PathBuf::from("/r"),
                probed: 3,
                subdirs: 1,
                failures: 1,
            }
        );
        assert!(waves.is_idle());
        assert_eq!(waves.outstanding(), 0);
    }

    #[test]
    fn test_waves_settle_independently() {
        let mut waves = WaveTracker::new();
        let a = waves.open(Path::new("/r/a"), 2).unwrap();
        let b = waves.open(Path::new("/r/b"), 1).unwrap();
        assert_ne!(a, b);
        assert_eq!(waves.open_waves(), 2);

        let settled = waves.record(b, ProbeVerdict::NotDirectory).unwrap();
        assert_eq!(settled.dir, PathBuf::from("/r/b"));
        assert_eq!(waves.open_waves(), 1);
        assert_eq!(waves.outstanding(), 2);

        assert!(waves.record(a, ProbeVerdict::Directory).is_none());
        assert!(waves.record(a, ProbeVerdict::Directory).is_some());
        assert!(waves.is_idle());
    }

    #[test]
    fn test_unknown_wave_is_ignored() {
        let mut waves = WaveTracker::new();
        let id = waves.open(Path::new("/r"), 1).unwrap();
        waves.record(id, ProbeVerdict::NotDirectory);
        assert!(waves.record(id, ProbeVerdict::NotDirectory).is_none());
        assert_eq!(waves.outstanding(), 0);
    }
}
