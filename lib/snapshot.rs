//! Immutable, reference-counted captures of a directory.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::handle::DirHandle;
use crate::record::DirRecord;
use crate::sync::Arc;
use crate::sync::atomic::{AtomicUsize, Ordering};

/// The records of one directory, captured at one point in time.
///
/// A snapshot is owned through [`Arc`]: the store holds one strong reference while the path is
/// mapped, and every live [`DirHandle`] holds another. Memory is released when the last of those
/// goes away, so unlinking a snapshot never pulls it out from under a reader.
///
/// Separately from the `Arc`, `readers` counts live handles. Eviction only ever unlinks a
/// snapshot whose `readers` is zero, and `readers` is only incremented while the store lock is
/// held, so the check cannot race with a concurrent `open`.
#[derive(Debug)]
pub struct Snapshot {
    path: PathBuf,
    records: Box<[DirRecord]>,
    created_at: Instant,
    readers: AtomicUsize,
}

impl Snapshot {
    /// Freeze a scan result into a snapshot.
    ///
    /// Scans are unordered; records are sorted by name here so that two populations of the same
    /// directory produce the same sequence.
    pub(crate) fn new(path: PathBuf, mut records: Vec<DirRecord>) -> Self {
        records.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        Self {
            path,
            records: records.into_boxed_slice(),
            created_at: Instant::now(),
            readers: AtomicUsize::new(0),
        }
    }

    /// The store key this snapshot was populated for.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, in name order.
    #[must_use]
    pub fn records(&self) -> &[DirRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the directory was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When the scan backing this snapshot completed.
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time elapsed since population.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Number of live handles over this snapshot.
    #[must_use]
    pub fn readers(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    /// Whether this snapshot is older than `max_age`.
    #[must_use]
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }

    /// Stale and unreferenced. Only meaningful while the store lock is held exclusively.
    pub(crate) fn is_evictable(&self, max_age: Duration) -> bool {
        self.readers() == 0 && self.is_stale(max_age)
    }

    /// Create a new handle over this snapshot.
    ///
    /// Must be called while the store lock is held (shared or exclusive) so that eviction
    /// observes the new reader.
    pub(crate) fn acquire(self: &Arc<Self>) -> DirHandle {
        self.readers.fetch_add(1, Ordering::AcqRel);
        DirHandle::new(Arc::clone(self))
    }

    /// Drop a reader. Called exactly once per handle, from its `Drop`.
    pub(crate) fn release(&self) {
        let prev = self.readers.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "snapshot reader count underflow");
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        trace!(path = ?self.path, records = self.records.len(), "destroying snapshot");
    }
}
