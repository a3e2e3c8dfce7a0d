//! Durable live-state cache.
//!
//! One JSON snapshot at `<data_dir>/live_cache.json`, keyed by identity and
//! rewritten wholesale after every mutation.

pub mod backend;
pub mod backend_file;
pub mod backend_memory;
pub mod cache;
pub mod error;

pub use {
    backend::{Snapshot, SnapshotBackend},
    backend_file::FileBackend,
    backend_memory::InMemoryBackend,
    cache::{CacheEntry, DEFAULT_GRACE_THRESHOLD, LiveCache},
    error::{Error, Result},
};
