//! JSON file-backed snapshot with atomic writes.

use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    tokio::fs,
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    backend::{Snapshot, SnapshotBackend},
    error::Context,
};

/// File-backed snapshot. The whole cache lives in one pretty-printed JSON file.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        Ok(())
    }

    /// Move an unreadable snapshot out of the way so the next write does not
    /// destroy it.
    async fn quarantine(&self) {
        let corrupt = self.path.with_extension("json.corrupt");
        match fs::rename(&self.path, &corrupt).await {
            Ok(()) => warn!(path = %corrupt.display(), "moved corrupt snapshot aside"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to move corrupt snapshot"),
        }
    }
}

#[async_trait]
impl SnapshotBackend for FileBackend {
    async fn load(&self) -> Result<Snapshot> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot yet");
                return Ok(Snapshot::new());
            },
            Err(e) => {
                self.quarantine().await;
                return Err(Error::corrupt(self.path.display().to_string(), e));
            },
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Snapshot::new());
        }
        match serde_json::from_slice(&data) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                self.quarantine().await;
                Err(Error::corrupt(self.path.display().to_string(), e))
            },
        }
    }

    /// Atomic write: write to temp, keep the previous file as `.bak`, rename
    /// over target.
    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.ensure_parent().await?;
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, json.as_bytes()).await?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            let _ = fs::copy(&self.path, &bak).await;
        }

        fs::rename(&tmp, &self.path).await?;
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
        tempfile::TempDir,
    };

    fn entry(message_id: &str, title: &str) -> CacheEntry {
        CacheEntry {
            artifact: ArtifactRef::new(message_id, "100"),
            missed_checks: 0,
            title: title.into(),
        }
    }

    #[tokio::test]
    async fn test_file_backend_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::new(tmp.path().join("live_cache.json"));

        let mut snapshot = Snapshot::new();
        snapshot.insert(Identity::new("alice").unwrap(), entry("1", "A"));
        snapshot.insert(Identity::new("bob").unwrap(), entry("2", "B"));
        backend.save(&snapshot).await.unwrap();

        assert_eq!(backend.load().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_file_backend_load_missing() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::new(tmp.path().join("nested/live_cache.json"));
        assert!(backend.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_backend_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data/live_cache.json");
        let backend = FileBackend::new(&path);
        backend.save(&Snapshot::new()).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_file_backend_backup_created() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::new(tmp.path().join("live_cache.json"));

        backend.save(&Snapshot::new()).await.unwrap();
        backend.save(&Snapshot::new()).await.unwrap();

        assert!(tmp.path().join("live_cache.json.bak").exists());
        assert!(!tmp.path().join("live_cache.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_backend_corrupt_is_quarantined() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("live_cache.json");
        std::fs::write(&path, "{not json").unwrap();

        let backend = FileBackend::new(&path);
        let err = backend.load().await.unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
        assert!(!path.exists());
        assert!(tmp.path().join("live_cache.json.corrupt").exists());
    }

    #[tokio::test]
    async fn test_file_backend_non_utf8_is_quarantined() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("live_cache.json");
        std::fs::write(&path, [0xff, 0xfe, b'{', 0x80]).unwrap();

        let backend = FileBackend::new(&path);
        let err = backend.load().await.unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
        assert!(!path.exists());
        assert!(tmp.path().join("live_cache.json.corrupt").exists());

        backend.save(&Snapshot::new()).await.unwrap();
        assert_eq!(
            std::fs::read(tmp.path().join("live_cache.json.corrupt")).unwrap(),
            [0xff, 0xfe, b'{', 0x80]
        );
    }

    #[tokio::test]
    async fn test_file_backend_empty_file_is_empty_snapshot() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("live_cache.json");
        std::fs::write(&path, "").unwrap();
        let backend = FileBackend::new(&path);
        assert!(backend.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_backend_reads_legacy_layout() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("live_cache.json");
        std::fs::write(
            &path,
            r#"{
  "Alice": {
    "message_id": 1190000000000000001,
    "channel_id": 1180000000000000002,
    "missed_checks": 2,
    "title": "speedrun"
  }
}"#,
        )
        .unwrap();

        let snapshot = FileBackend::new(&path).load().await.unwrap();
        let entry = &snapshot[&Identity::new("alice").unwrap()];
        assert_eq!(entry.artifact.message_id, "1190000000000000001");
        assert_eq!(entry.artifact.channel_id, "1180000000000000002");
        assert_eq!(entry.missed_checks, 2);
        assert_eq!(entry.title, "speedrun");
    }
}
