use std::collections::hash_map::Entry;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::{debug, instrument, trace, warn};

use crate::config::{DirCacheConfig, EvictionTrigger};
use crate::error::{OpenError, SweeperError};
use crate::evict::Sweeper;
use crate::handle::DirHandle;
use crate::listing::{Listing, RecordCompare, RecordFilter};
use crate::scan::{DirScanner, StdScanner};
use crate::snapshot::Snapshot;
use crate::sync::atomic::{AtomicU64, Ordering};
use crate::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Point-in-time counters describing how the cache has been used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Opens served from an existing snapshot.
    pub hits: u64,
    /// Opens that found no snapshot and had to scan.
    pub misses: u64,
    /// Snapshots installed into the store.
    pub populations: u64,
    /// Freshly scanned snapshots thrown away because another caller installed one first.
    pub discarded_races: u64,
    /// Snapshots unlinked for being stale.
    pub evictions: u64,
    /// Snapshots unlinked by `invalidate` or `invalidate_all`.
    pub invalidations: u64,
}

struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    populations: AtomicU64,
    discarded_races: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl StatsCounters {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            populations: AtomicU64::new(0),
            discarded_races: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    fn bump(counter: &AtomicU64, by: usize) {
        counter.fetch_add(by as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            populations: self.populations.load(Ordering::Relaxed),
            discarded_races: self.discarded_races.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

/// Normalize `path` lexically so that `a/b`, `a/b/` and `a/./b` share one store entry.
///
/// Never touches storage: symlinks and `..` are kept as written.
fn store_key(path: &Path) -> PathBuf {
    let key: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if key.as_os_str().is_empty() && !path.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        key
    }
}

/// Scans in flight for one path.
struct Populating {
    scans: usize,
    /// Single-path invalidations of this path since the oldest in-flight scan began.
    invalidations: u64,
}

/// What the store looked like for one path when its scan began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Claim {
    generation: u64,
    invalidations: u64,
}

#[derive(Default)]
struct Store {
    entries: FxHashMap<PathBuf, Arc<Snapshot>>,
    populating: FxHashMap<PathBuf, Populating>,
    /// Bumped by every `invalidate_all`.
    generation: u64,
}

impl Store {
    /// Register a scan of `key` about to run with no lock held.
    fn claim(&mut self, key: &Path) -> Claim {
        let populating = self
            .populating
            .entry(key.to_path_buf())
            .or_insert(Populating {
                scans: 0,
                invalidations: 0,
            });
        populating.scans += 1;
        Claim {
            generation: self.generation,
            invalidations: populating.invalidations,
        }
    }

    /// Retire `claim` and report whether `key` was invalidated while its scan ran.
    fn finish(&mut self, key: &Path, claim: Claim) -> bool {
        let Some(populating) = self.populating.get_mut(key) else {
            return self.generation != claim.generation;
        };
        populating.scans -= 1;
        let now = Claim {
            generation: self.generation,
            invalidations: populating.invalidations,
        };
        if populating.scans == 0 {
            self.populating.remove(key);
        }
        now != claim
    }
}

/// An in-memory cache of directory snapshots, keyed by path.
///
/// All map access goes through a single reader/writer lock: lookups take it shared, insertion and
/// unlinking take it exclusively. Scanning storage happens with no lock held, so a slow directory
/// never blocks lookups of unrelated paths.
///
/// The cache is an ordinary value. Construct one at startup, share it by reference (or [`Arc`])
/// with whatever needs it, and drop it at shutdown; snapshots still pinned by open handles outlive
/// it.
pub struct DirCache {
    store: RwLock<Store>,
    scanner: Box<dyn DirScanner>,
    config: DirCacheConfig,
    stats: StatsCounters,
}

impl Default for DirCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DirCache {
    /// A cache over the real filesystem with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DirCacheConfig::default())
    }

    /// A cache over the real filesystem.
    #[must_use]
    pub fn with_config(config: DirCacheConfig) -> Self {
        Self::with_scanner(StdScanner::default(), config)
    }

    /// A cache in front of an arbitrary scan primitive.
    pub fn with_scanner(scanner: impl DirScanner, config: DirCacheConfig) -> Self {
        Self {
            store: RwLock::new(Store::default()),
            scanner: Box::new(scanner),
            config,
            stats: StatsCounters::new(),
        }
    }

    /// The configuration this cache was built with.
    #[must_use]
    pub fn config(&self) -> &DirCacheConfig {
        &self.config
    }

    fn read_store(&self) -> RwLockReadGuard<'_, Store> {
        // Snapshots are immutable once inserted, so a panic under the lock cannot leave a
        // half-written entry behind.
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open `path` for sequential reading.
    ///
    /// Served from the store if a snapshot exists; otherwise the directory is scanned and the
    /// result installed. If two callers race to populate the same path, both scan, the first to
    /// install wins and the other adopts its snapshot.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<DirHandle, OpenError> {
        self.open_path(path.as_ref())
    }

    #[instrument(name = "DirCache::open", skip(self))]
    fn open_path(&self, path: &Path) -> Result<DirHandle, OpenError> {
        if self.config.eviction == EvictionTrigger::OnOpen {
            self.evict_stale();
        }

        let key = store_key(path);
        if let Some(handle) = self.lookup(&key) {
            StatsCounters::bump(&self.stats.hits, 1);
            trace!("cache hit");
            return Ok(handle);
        }

        let claim = {
            let mut store = self.write_store();
            if let Some(snapshot) = store.entries.get(&key) {
                StatsCounters::bump(&self.stats.hits, 1);
                trace!("cache hit on recheck");
                return Ok(snapshot.acquire());
            }
            store.claim(&key)
        };
        StatsCounters::bump(&self.stats.misses, 1);

        let scanned = self.populate(&key);

        let mut store = self.write_store();
        let invalidated = store.finish(&key, claim);
        let fresh = scanned?;
        let handle = match store.entries.entry(key) {
            Entry::Occupied(occ) => {
                StatsCounters::bump(&self.stats.discarded_races, 1);
                debug!("lost population race, adopting the installed snapshot");
                occ.get().acquire()
            }
            Entry::Vacant(_) if invalidated => {
                // Invalidated mid-scan. The caller still gets what it scanned, but the snapshot
                // is never reachable through the store.
                debug!("store invalidated during scan, handing out an unlinked snapshot");
                Arc::new(fresh).acquire()
            }
            Entry::Vacant(vac) => {
                StatsCounters::bump(&self.stats.populations, 1);
                vac.insert(Arc::new(fresh)).acquire()
            }
        };
        Ok(handle)
    }

    fn lookup(&self, key: &Path) -> Option<DirHandle> {
        self.read_store().entries.get(key).map(Snapshot::acquire)
    }

    /// Scan `key` and freeze the result. Runs with no lock held.
    fn populate(&self, key: &Path) -> Result<Snapshot, OpenError> {
        let started = Instant::now();
        let records = self.scanner.scan(key).map_err(|source| {
            let err = OpenError::from_scan(key, source);
            if !err.is_not_found() {
                warn!(error = %err, "directory scan failed");
            }
            err
        })?;
        debug!(
            records = records.len(),
            elapsed = ?started.elapsed(),
            "scanned directory"
        );
        Ok(Snapshot::new(key.to_path_buf(), records))
    }

    /// List `path` in one shot, like `scandir(3)`.
    ///
    /// Records for which `filter` returns `false` are left out; the rest are sorted with `compare`
    /// if given, otherwise they keep snapshot (name) order. The listing shares the snapshot used
    /// by [`open`](Self::open) and pins it until dropped.
    pub fn list<P: AsRef<Path>>(
        &self,
        path: P,
        filter: Option<RecordFilter<'_>>,
        compare: Option<RecordCompare<'_>>,
    ) -> Result<Listing, OpenError> {
        self.list_path(path.as_ref(), filter, compare)
    }

    #[instrument(name = "DirCache::list", skip(self, filter, compare))]
    fn list_path(
        &self,
        path: &Path,
        filter: Option<RecordFilter<'_>>,
        compare: Option<RecordCompare<'_>>,
    ) -> Result<Listing, OpenError> {
        let handle = self.open_path(path)?;
        let listing = Listing::build(handle, filter, compare);
        trace!(selected = listing.len(), "built listing");
        Ok(listing)
    }

    /// Unlink every snapshot from the store.
    ///
    /// Open handles keep reading the snapshot they already have; the next `open` of any path
    /// scans again. Unreferenced snapshots are freed before this returns.
    pub fn invalidate_all(&self) {
        let unlinked: Vec<Arc<Snapshot>> = {
            let mut store = self.write_store();
            store.generation += 1;
            store.entries.drain().map(|(_, s)| s).collect()
        };
        let pinned = unlinked.iter().filter(|s| s.readers() > 0).count();
        StatsCounters::bump(&self.stats.invalidations, unlinked.len());
        debug!(unlinked = unlinked.len(), pinned, "invalidated all snapshots");
    }

    /// Unlink the snapshot for one path, if any. Same rules as [`invalidate_all`](Self::invalidate_all).
    ///
    /// A scan of `path` already in flight will not be installed. Scans of other paths are
    /// unaffected.
    ///
    /// Returns `true` if a snapshot was unlinked.
    pub fn invalidate<P: AsRef<Path>>(&self, path: P) -> bool {
        let key = store_key(path.as_ref());
        let unlinked = {
            let mut store = self.write_store();
            if let Some(populating) = store.populating.get_mut(&key) {
                populating.invalidations += 1;
            }
            store.entries.remove(&key)
        };
        if let Some(snapshot) = &unlinked {
            StatsCounters::bump(&self.stats.invalidations, 1);
            debug!(path = ?key, pinned = snapshot.readers() > 0, "invalidated snapshot");
        }
        unlinked.is_some()
    }

    /// Unlink every snapshot that is older than the configured `max-age` and has no open handles.
    ///
    /// Returns the number of snapshots unlinked. Does nothing if `max-age` is unset.
    pub fn evict_stale(&self) -> usize {
        let Some(max_age) = self.config.max_age else {
            return 0;
        };

        // Only take the write lock if something is evictable.
        if !self
            .read_store()
            .entries
            .values()
            .any(|s| s.is_evictable(max_age))
        {
            return 0;
        }

        let mut evicted = Vec::new();
        // Reader counts only grow under the store lock, so what we observe here holds until the
        // guard drops.
        self.write_store().entries.retain(|_, snapshot| {
            if snapshot.is_evictable(max_age) {
                evicted.push(Arc::clone(snapshot));
                false
            } else {
                true
            }
        });

        if !evicted.is_empty() {
            StatsCounters::bump(&self.stats.evictions, evicted.len());
            debug!(evicted = evicted.len(), ?max_age, "evicted stale snapshots");
        }
        evicted.len()
    }

    /// Start the periodic sweeper for an [`EvictionTrigger::Interval`] cache on the current tokio
    /// runtime.
    ///
    /// The sweeper holds only a weak reference: it stops by itself once the cache is dropped, or
    /// when the returned guard is.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Result<Sweeper, SweeperError> {
        let EvictionTrigger::Interval(period) = self.config.eviction else {
            return Err(SweeperError::NotScheduled);
        };
        let runtime = tokio::runtime::Handle::try_current()?;
        Ok(Sweeper::spawn(&runtime, Arc::downgrade(self), period))
    }

    /// Number of paths currently mapped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_store().entries.len()
    }

    /// Whether no path is currently mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_store().entries.is_empty()
    }

    /// Whether `path` currently has a snapshot in the store.
    #[must_use]
    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        self.read_store().entries.contains_key(&store_key(path.as_ref()))
    }

    /// Usage counters since construction.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

impl fmt::Debug for DirCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirCache")
            .field("entries", &self.len())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
