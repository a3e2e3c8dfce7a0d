//! The live-state cache: which identities we believe are live, and what we
//! posted for them.

use std::sync::Arc;

use {
    serde::{Deserialize, Serialize},
    streamwatch_common::{ArtifactRef, Identity},
    tracing::{debug, info, warn},
};

use crate::{
    Result,
    backend::{Snapshot, SnapshotBackend},
};

/// Number of consecutive offline observations tolerated before eviction.
pub const DEFAULT_GRACE_THRESHOLD: u32 = 3;

/// Persisted belief that an identity is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub artifact: ArtifactRef,
    #[serde(default)]
    pub missed_checks: u32,
    pub title: String,
}

/// Write-through cache over a [`SnapshotBackend`].
///
/// An entry exists iff the identity is believed live (possibly within grace).
/// Every mutation rewrites the snapshot before returning. If that write fails
/// the in-memory state still reflects the mutation and the error is returned;
/// the next successful write catches the snapshot up.
pub struct LiveCache {
    entries: Snapshot,
    backend: Arc<dyn SnapshotBackend>,
    grace_threshold: u32,
}

impl LiveCache {
    /// Load the snapshot. Missing or unreadable snapshots start an empty cache.
    pub async fn open(backend: Arc<dyn SnapshotBackend>, grace_threshold: u32) -> Self {
        let entries = match backend.load().await {
            Ok(entries) => {
                info!(count = entries.len(), "loaded live cache");
                entries
            },
            Err(e) => {
                warn!(error = %e, "live cache unreadable, starting fresh");
                Snapshot::new()
            },
        };
        Self {
            entries,
            backend,
            grace_threshold: grace_threshold.max(1),
        }
    }

    pub fn grace_threshold(&self) -> u32 {
        self.grace_threshold
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, ordered by identity.
    pub fn entries(&self) -> impl Iterator<Item = (&Identity, &CacheEntry)> {
        self.entries.iter()
    }

    pub fn is_tracked(&self, identity: &Identity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn get(&self, identity: &Identity) -> Option<&CacheEntry> {
        self.entries.get(identity)
    }

    /// Create or fully replace an entry, with the miss counter at zero.
    pub async fn put(
        &mut self,
        identity: Identity,
        artifact: ArtifactRef,
        title: impl Into<String>,
    ) -> Result<()> {
        let entry = CacheEntry {
            artifact,
            missed_checks: 0,
            title: title.into(),
        };
        debug!(identity = %identity, artifact = %entry.artifact, "cache put");
        self.entries.insert(identity, entry);
        self.persist().await
    }

    /// Delete an entry. Absent entries are a no-op and do not touch storage.
    pub async fn remove(&mut self, identity: &Identity) -> Result<()> {
        if self.entries.remove(identity).is_none() {
            return Ok(());
        }
        debug!(identity = %identity, "cache remove");
        self.persist().await
    }

    /// Count one more offline observation. Returns the new count, or 0 when
    /// the identity is not tracked.
    pub async fn record_miss(&mut self, identity: &Identity) -> Result<u32> {
        let Some(entry) = self.entries.get_mut(identity) else {
            return Ok(0);
        };
        entry.missed_checks = entry.missed_checks.saturating_add(1);
        let missed = entry.missed_checks;
        debug!(identity = %identity, missed, "cache miss recorded");
        self.persist().await?;
        Ok(missed)
    }

    pub fn should_evict(&self, identity: &Identity) -> bool {
        self.entries
            .get(identity)
            .is_some_and(|e| e.missed_checks >= self.grace_threshold)
    }

    async fn persist(&self) -> Result<()> {
        self.backend.save(&self.entries).await
    }
}
