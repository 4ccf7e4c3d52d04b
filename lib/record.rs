//! Directory records as captured from a scan.

use std::ffi::{OsStr, OsString};
use std::fs::FileType;

/// The type of a directory entry, as reported by the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RecordKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// A symbolic link.
    Symlink,
    /// A device node, FIFO, socket or anything else the platform reports.
    Other,
    /// The scan could not determine the type (`DT_UNKNOWN`).
    Unknown,
}

impl From<FileType> for RecordKind {
    fn from(ft: FileType) -> Self {
        if ft.is_dir() {
            Self::Directory
        } else if ft.is_file() {
            Self::File
        } else if ft.is_symlink() {
            Self::Symlink
        } else {
            Self::Other
        }
    }
}

/// One entry of a directory.
///
/// Records are plain values: the cache copies them out of the scan once and never touches them
/// again, so every reader of a snapshot sees exactly what the scan produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirRecord {
    /// The name of this entry within its parent directory.
    pub name: OsString,
    /// The type of this entry.
    pub kind: RecordKind,
    /// The inode-like identifier the platform reports, or `0` if it has none.
    pub ino: u64,
}

impl DirRecord {
    /// Build a record from its parts.
    pub fn new(name: impl Into<OsString>, kind: RecordKind, ino: u64) -> Self {
        Self {
            name: name.into(),
            kind,
            ino,
        }
    }

    /// The entry name.
    #[must_use]
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// Whether this entry is itself a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == RecordKind::Directory
    }

    /// Whether this is one of the `.` / `..` self and parent links.
    #[must_use]
    pub fn is_dot_entry(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_entries_are_detected() {
        assert!(DirRecord::new(".", RecordKind::Directory, 0).is_dot_entry());
        assert!(DirRecord::new("..", RecordKind::Directory, 0).is_dot_entry());
        assert!(!DirRecord::new("...", RecordKind::File, 0).is_dot_entry());
        assert!(!DirRecord::new(".hidden", RecordKind::File, 0).is_dot_entry());
    }

    #[test]
    fn is_dir_follows_kind() {
        assert!(DirRecord::new("d", RecordKind::Directory, 1).is_dir());
        assert!(!DirRecord::new("l", RecordKind::Symlink, 2).is_dir());
    }
}
