//! dircache shared library.
//!
//! An in-memory cache that sits in front of directory scans. Every path maps to at most one
//! immutable [`Snapshot`]; callers read it through readdir-style [`DirHandle`] cursors or take a
//! filtered, sorted [`Listing`] of it in one shot.

/// Serde-backed tuning knobs for the cache.
pub mod config;
pub mod error;
/// Background staleness sweeper.
pub mod evict;
pub mod handle;
/// Bulk, scandir-style views over a snapshot.
pub mod listing;
pub mod record;
/// The directory scan primitive the cache sits in front of.
pub mod scan;
pub mod snapshot;
/// The keyed, lock-guarded store of snapshots.
pub mod store;
pub mod sync;

pub use config::{DirCacheConfig, EvictionTrigger};
pub use error::{OpenError, SweeperError};
pub use evict::Sweeper;
pub use handle::DirHandle;
pub use listing::{Listing, RecordCompare, RecordFilter, alphasort, by_kind_then_name};
pub use record::{DirRecord, RecordKind};
pub use scan::{DirScanner, StdScanner};
pub use snapshot::Snapshot;
pub use store::{CacheStats, DirCache};
