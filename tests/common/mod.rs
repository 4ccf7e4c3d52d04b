#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use dircache::{DirHandle, DirRecord, DirScanner, RecordKind};

#[derive(Default)]
struct MockState {
    tree: Mutex<HashMap<PathBuf, Vec<DirRecord>>>,
    failures: Mutex<HashMap<PathBuf, io::ErrorKind>>,
    scans: Mutex<HashMap<PathBuf, usize>>,
    total_scans: AtomicUsize,
    gate: Mutex<Option<Arc<ScanGate>>>,
}

/// A pair of barriers every gated scan passes through: one on entry, one before returning.
///
/// With `parties` = number of concurrent scans (plus the test thread, if it wants to act while
/// the scans are paused), this pins down exactly when scans overlap.
pub struct ScanGate {
    pub enter: Barrier,
    pub leave: Barrier,
}

impl ScanGate {
    pub fn new(parties: usize) -> Arc<Self> {
        Arc::new(Self {
            enter: Barrier::new(parties),
            leave: Barrier::new(parties),
        })
    }
}

/// A scripted scanner that records how often each path was scanned.
///
/// Clones share state, so a test can hand one clone to the cache and keep another to script and
/// inspect it.
#[derive(Clone, Default)]
pub struct MockScanner {
    state: Arc<MockState>,
}

impl MockScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the contents of `path`, in the (unsorted) order the scan should yield them.
    pub fn set_dir(&self, path: impl Into<PathBuf>, names: &[&str]) {
        let records = names
            .iter()
            .enumerate()
            .map(|(i, name)| DirRecord::new(*name, RecordKind::File, i as u64 + 100))
            .collect();
        self.set_records(path, records);
    }

    pub fn set_records(&self, path: impl Into<PathBuf>, records: Vec<DirRecord>) {
        self.state.tree.lock().unwrap().insert(path.into(), records);
    }

    /// Make every scan of `path` fail with `kind`.
    pub fn fail(&self, path: impl Into<PathBuf>, kind: io::ErrorKind) {
        self.state.failures.lock().unwrap().insert(path.into(), kind);
    }

    /// Make every scan wait on both barriers of `gate`.
    pub fn gate_on(&self, gate: Arc<ScanGate>) {
        *self.state.gate.lock().unwrap() = Some(gate);
    }

    pub fn scans_of(&self, path: impl AsRef<Path>) -> usize {
        self.state
            .scans
            .lock()
            .unwrap()
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_scans(&self) -> usize {
        self.state.total_scans.load(Ordering::SeqCst)
    }
}

impl DirScanner for MockScanner {
    fn scan(&self, path: &Path) -> io::Result<Vec<DirRecord>> {
        self.state.total_scans.fetch_add(1, Ordering::SeqCst);
        *self
            .state
            .scans
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default() += 1;

        let gate = self.state.gate.lock().unwrap().clone();
        if let Some(gate) = &gate {
            gate.enter.wait();
            gate.leave.wait();
        }

        if let Some(kind) = self.state.failures.lock().unwrap().get(path) {
            return Err(io::Error::from(*kind));
        }
        self.state
            .tree
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

/// Read every remaining record of `handle` and return the names.
pub fn drain_names(handle: &mut DirHandle) -> Vec<String> {
    let mut names = Vec::new();
    while let Some(record) = handle.read() {
        names.push(record.name.to_string_lossy().into_owned());
    }
    names
}
