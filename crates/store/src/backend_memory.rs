//! In-memory snapshot for testing.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;

use crate::{
    Error, Result,
    backend::{Snapshot, SnapshotBackend},
};

/// In-memory backend. No persistence; counts writes and can be told to fail.
#[derive(Default)]
pub struct InMemoryBackend {
    snapshot: Mutex<Snapshot>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot, as if the process had restarted.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail (simulates a full disk).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The last successfully saved snapshot.
    pub fn current(&self) -> Snapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SnapshotBackend for InMemoryBackend {
    async fn load(&self) -> Result<Snapshot> {
        Ok(self.current())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::message("in-memory backend refused write"));
        }
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = snapshot.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::cache::CacheEntry,
        streamwatch_common::{ArtifactRef, Identity},
    };

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let backend = InMemoryBackend::new();
        let mut snapshot = Snapshot::new();
        snapshot.insert(Identity::new("alice").unwrap(), CacheEntry {
            artifact: ArtifactRef::new("1", "2"),
            missed_checks: 1,
            title: "A".into(),
        });
        backend.save(&snapshot).await.unwrap();

        assert_eq!(backend.load().await.unwrap(), snapshot);
        assert_eq!(backend.save_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_saves() {
        let backend = InMemoryBackend::new();
        backend.set_fail_saves(true);
        assert!(backend.save(&Snapshot::new()).await.is_err());
        assert_eq!(backend.save_count(), 0);
    }
}
