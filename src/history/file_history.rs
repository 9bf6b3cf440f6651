use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{DeploymentHistory, HistoryEntry};
use crate::constants::RECORD_EXTENSION;
use crate::store::file_store::write_atomically;
use crate::store::{is_valid_key, validate_key, StoreError, StoreResult};

/// File-per-entry history rooted at a user-scoped directory
///
/// Each entry lives in `<dir>/<run id>.json` and is written the same way as
/// tracked records. Unreadable entries are skipped when listing.
#[derive(Debug, Clone)]
pub struct FileDeploymentHistory {
    dir: PathBuf,
}

impl FileDeploymentHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    async fn load(&self, path: &Path) -> StoreResult<Option<HistoryEntry>> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| StoreError::CorruptRecord {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl DeploymentHistory for FileDeploymentHistory {
    async fn record(&self, entry: &HistoryEntry) -> StoreResult<()> {
        validate_key(&entry.id)?;
        let path = self.entry_path(&entry.id);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let data = serde_json::to_vec_pretty(entry).map_err(|e| StoreError::Serialization {
            path: path.clone(),
            source: e,
        })?;

        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &data))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;

        debug!(id = %entry.id, path = %path.display(), "Recorded deployment history entry");
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<HistoryEntry>> {
        if !is_valid_key(id) {
            return Ok(None);
        }
        self.load(&self.entry_path(id)).await
    }

    async fn recent(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        let mut dir_entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut entries = Vec::new();
        while let Some(dir_entry) = dir_entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let path = dir_entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            match self.load(&path).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable history entry");
                }
            }
        }

        entries.sort_by(HistoryEntry::newest_first);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn remove(&self, id: &str) -> StoreResult<()> {
        if !is_valid_key(id) {
            return Ok(());
        }
        let path = self.entry_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}
