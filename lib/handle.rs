//! Readdir-style cursors over a snapshot.

use std::fmt;
use std::path::Path;

use tracing::trace;

use crate::record::DirRecord;
use crate::snapshot::Snapshot;
use crate::sync::Arc;

/// A per-open cursor over one [`Snapshot`].
///
/// The handle keeps its snapshot alive until it is closed or dropped, even if the snapshot is
/// invalidated in the meantime. Dropping a handle is the same as [`close`](Self::close); the
/// reader count is released exactly once either way.
///
/// A handle is single-owner: every mutating call takes `&mut self`. The snapshot behind it is
/// shared read-only with any number of other handles.
pub struct DirHandle {
    snapshot: Arc<Snapshot>,
    position: usize,
}

impl DirHandle {
    pub(crate) fn new(snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            position: 0,
        }
    }

    /// Return the record at the cursor and advance it, or `None` once every record has been read.
    ///
    /// Keeps returning `None` after the end is reached.
    pub fn read(&mut self) -> Option<&DirRecord> {
        let record = self.snapshot.records().get(self.position)?;
        self.position += 1;
        Some(record)
    }

    /// Move the cursor back to the first record.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// The current cursor position, suitable for a later [`seek`](Self::seek).
    #[must_use]
    pub fn tell(&self) -> usize {
        self.position
    }

    /// Restore a position obtained from [`tell`](Self::tell).
    ///
    /// Positions past the end of the snapshot are ignored; the cursor stays where it was.
    pub fn seek(&mut self, loc: usize) {
        if loc <= self.snapshot.len() {
            self.position = loc;
        } else {
            trace!(loc, len = self.snapshot.len(), "ignoring out-of-range seek");
        }
    }

    /// Release this handle's reference on its snapshot.
    pub fn close(self) {
        drop(self);
    }

    /// Total number of records in the underlying snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    /// Whether the underlying directory was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Records left before the end.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.snapshot.len().saturating_sub(self.position)
    }

    /// The path this handle was opened on.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.snapshot.path()
    }

    /// The snapshot this handle reads from.
    #[must_use]
    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }
}

impl Drop for DirHandle {
    fn drop(&mut self) {
        self.snapshot.release();
    }
}

impl fmt::Debug for DirHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirHandle")
            .field("path", &self.snapshot.path())
            .field("position", &self.position)
            .field("len", &self.snapshot.len())
            .finish()
    }
}
