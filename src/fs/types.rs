//! Entry metadata returned by probes
//!
//! The engine only looks at [`EntryType::is_dir`]; everything else is carried
//! along for consumers of the filesystem layer.

use std::fs::{FileType, Metadata};

/// Type of filesystem entry, after following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Devices, sockets, FIFOs
    Other,
}

impl EntryType {
    /// Convert from a std file type
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_dir() {
            EntryType::Directory
        } else if file_type.is_file() {
            EntryType::File
        } else {
            EntryType::Other
        }
    }

    /// Check if this is a regular file
    pub fn is_file(&self) -> bool {
        *self == EntryType::File
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryType::Directory
    }
}

/// Result of a metadata probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    pub entry_type: EntryType,

    /// Size in bytes (0 for directories in the in-memory filesystem)
    pub size: u64,
}

impl EntryMetadata {
    pub fn directory() -> Self {
        Self {
            entry_type: EntryType::Directory,
            size: 0,
        }
    }

    pub fn file(size: u64) -> Self {
        Self {
            entry_type: EntryType::File,
            size,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type.is_dir()
    }
}

impl From<&Metadata> for EntryMetadata {
    fn from(meta: &Metadata) -> Self {
        Self {
            entry_type: EntryType::from_file_type(meta.file_type()),
            size: meta.len(),
        }
    }
}
