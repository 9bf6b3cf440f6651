use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{is_valid_key, validate_key, StoreError, StoreResult, TrackedRecord, TrackerStore};
use crate::constants::RECORD_EXTENSION;
use crate::domain::TrackedDeployment;

/// File-per-record store rooted at a user-scoped directory
///
/// Each record lives in `<dir>/<id>.json`. Writes go to a temporary file in
/// the same directory and are renamed over the target, so readers only ever
/// see a complete record. A record that fails to parse is skipped during
/// scans rather than hiding every other tracked deployment.
#[derive(Debug, Clone)]
pub struct FileTrackerStore {
    dir: PathBuf,
}

impl FileTrackerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> StoreResult<PathBuf> {
        validate_key(id)?;
        Ok(self.dir.join(format!("{id}.{RECORD_EXTENSION}")))
    }

    async fn load(&self, path: &Path) -> StoreResult<Option<TrackedDeployment>> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let record: TrackedRecord =
            serde_json::from_slice(&data).map_err(|e| StoreError::CorruptRecord {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        TrackedDeployment::try_from(record)
            .map(Some)
            .map_err(|reason| StoreError::CorruptRecord {
                path: path.to_path_buf(),
                reason,
            })
    }
}

#[async_trait]
impl TrackerStore for FileTrackerStore {
    async fn save(&self, tracked: &TrackedDeployment) -> StoreResult<()> {
        let path = self.record_path(tracked.id())?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let data = serde_json::to_vec_pretty(&TrackedRecord::from(tracked)).map_err(|e| {
            StoreError::Serialization {
                path: path.clone(),
                source: e,
            }
        })?;

        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &data))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;

        debug!(id = %tracked.id(), path = %path.display(), "Saved tracked deployment");
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<TrackedDeployment>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut tracked = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let path = entry.path();
            let is_record = path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION);
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if !is_record || !is_file {
                continue;
            }

            match self.load(&path).await {
                Ok(Some(td)) => tracked.push(td),
                // Removed between the directory scan and the read
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable tracked record");
                }
            }
        }

        Ok(tracked)
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<TrackedDeployment>> {
        // A key that can never be saved is simply not tracked
        if !is_valid_key(id) {
            return Ok(None);
        }
        let path = self.record_path(id)?;
        self.load(&path).await
    }

    async fn remove(&self, id: &str) -> StoreResult<()> {
        if !is_valid_key(id) {
            return Ok(());
        }
        let path = self.record_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(id = %id, "Removed tracked deployment");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

pub(crate) fn write_atomically(dir: &Path, target: &Path, data: &[u8]) -> StoreResult<()> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(data)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(target)
        .map_err(|e| StoreError::io(target, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RunConclusion, Workflow};
    use tempfile::TempDir;

    fn tracked(id: &str) -> TrackedDeployment {
        TrackedDeployment::new(id, Workflow::new("deploy.yml").unwrap(), "main", "owner/repo")
    }

    #[tokio::test]
    async fn test_missing_directory_lists_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTrackerStore::new(temp_dir.path().join("does-not-exist"));
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.get_by_id("run-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTrackerStore::new(temp_dir.path());

        let mut td = tracked("run-1");
        store.save(&td).await.unwrap();
        td.update_conclusion(RunConclusion::Success);
        store.save(&td).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_success());
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTrackerStore::new(temp_dir.path());
        store.remove("never-tracked").await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_record_skipped_in_scan() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTrackerStore::new(temp_dir.path());
        store.save(&tracked("good")).await.unwrap();
        std::fs::write(temp_dir.path().join("bad.json"), b"{ not json").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"ignored").unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id(), "good");

        let err = store.get_by_id("bad").await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptRecord { .. }));
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTrackerStore::new(temp_dir.path());
        let err = store.save(&tracked("../escape")).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_unstorable_key_reads_as_untracked() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTrackerStore::new(temp_dir.path());

        assert!(store.get_by_id("").await.unwrap().is_none());
        assert!(store.get_by_id("a/b").await.unwrap().is_none());
        assert!(store.get_by_id("../escape").await.unwrap().is_none());
        store.remove("").await.unwrap();
        store.remove("../escape").await.unwrap();
    }
}
