use std::io;
use std::path::Path;

use crate::record::{DirRecord, RecordKind};

/// Produces the raw, unordered contents of a directory.
///
/// This is the only place the cache touches storage. Implementations must be callable from many
/// threads at once; the cache never holds its store lock while a scan runs.
pub trait DirScanner: Send + Sync + 'static {
    /// Scan `path` and return its entries in whatever order the storage yields them.
    ///
    /// A missing or inaccessible directory should be reported with the matching
    /// [`io::ErrorKind`] (`NotFound`, `NotADirectory`, `PermissionDenied`) so the cache can tell
    /// it apart from other I/O failures.
    fn scan(&self, path: &Path) -> io::Result<Vec<DirRecord>>;
}

/// A [`DirScanner`] backed by [`std::fs::read_dir`].
#[derive(Debug, Clone, Copy)]
pub struct StdScanner {
    synthesize_dots: bool,
}

impl Default for StdScanner {
    fn default() -> Self {
        Self {
            synthesize_dots: true,
        }
    }
}

impl StdScanner {
    /// A scanner that yields only the real entries, without `.` and `..`.
    #[must_use]
    pub fn without_dots() -> Self {
        Self {
            synthesize_dots: false,
        }
    }
}

#[cfg(unix)]
fn dir_entry_ino(entry: &std::fs::DirEntry) -> u64 {
    use std::os::unix::fs::DirEntryExt as _;
    entry.ino()
}

#[cfg(not(unix))]
fn dir_entry_ino(_entry: &std::fs::DirEntry) -> u64 {
    0
}

#[cfg(unix)]
fn metadata_ino(meta: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt as _;
    meta.ino()
}

#[cfg(not(unix))]
fn metadata_ino(_meta: &std::fs::Metadata) -> u64 {
    0
}

impl DirScanner for StdScanner {
    fn scan(&self, path: &Path) -> io::Result<Vec<DirRecord>> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_dir() {
            return Err(io::Error::from(io::ErrorKind::NotADirectory));
        }

        let mut records = Vec::new();
        if self.synthesize_dots {
            // `read_dir` hides the self and parent links that readdir(3) reports.
            let parent_ino = std::fs::metadata(path.join(".."))
                .map(|m| metadata_ino(&m))
                .unwrap_or(0);
            records.push(DirRecord::new(".", RecordKind::Directory, metadata_ino(&meta)));
            records.push(DirRecord::new("..", RecordKind::Directory, parent_ino));
        }

        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let kind = entry
                .file_type()
                .map_or(RecordKind::Unknown, RecordKind::from);
            records.push(DirRecord::new(entry.file_name(), kind, dir_entry_ino(&entry)));
        }

        Ok(records)
    }
}
