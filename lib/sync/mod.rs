//! Synchronization primitives.
//!
//! Shims between loom and std synchronization primitives. Only the store lock and the counters
//! are modelled under loom; `Arc`/`Weak` stay std because loom has no `Weak`.
pub mod atomic;

#[cfg(loom)]
pub use loom::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(not(loom))]
pub use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use std::sync::{Arc, PoisonError, Weak};
