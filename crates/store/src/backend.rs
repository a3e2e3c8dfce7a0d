//! Persistence trait for the live-state snapshot.

use std::collections::BTreeMap;

use {async_trait::async_trait, streamwatch_common::Identity};

use crate::{Result, cache::CacheEntry};

/// Every cache entry, keyed by identity. Sorted so the file diffs cleanly.
pub type Snapshot = BTreeMap<Identity, CacheEntry>;

/// Storage for the whole snapshot. Writes replace the previous snapshot.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Load the last written snapshot. A missing snapshot is an empty one.
    async fn load(&self) -> Result<Snapshot>;
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}
