//! # Tracked-Run Store
//!
//! Durable, keyed storage for [`TrackedDeployment`] records.
//!
//! The store is a plain upsert/scan/delete collection. It never merges
//! records; reconciling a stored record with the remote run is the
//! orchestrator's job. Iteration order is unspecified.
//!
//! Two implementations are provided:
//!
//! - [`FileTrackerStore`]: one JSON file per record, written atomically, so
//!   `save` and `remove` are atomic per record without a collection-wide lock.
//! - [`InMemoryTrackerStore`]: a concurrent map, for tests and ephemeral use.

pub mod file_store;
pub mod memory_store;
pub mod record;

pub use file_store::FileTrackerStore;
pub use memory_store::InMemoryTrackerStore;
pub use record::TrackedRecord;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::domain::TrackedDeployment;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize record {}: {source}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corrupt record {}: {reason}", .path.display())]
    CorruptRecord { path: PathBuf, reason: String },

    #[error("Invalid record key: {0:?}")]
    InvalidKey(String),

    #[error("Background store task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Keyed persistence for tracked deployments
#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// Insert or fully overwrite the record with the same id
    async fn save(&self, tracked: &TrackedDeployment) -> StoreResult<()>;

    /// Every stored record; an empty or missing store yields an empty list
    async fn list(&self) -> StoreResult<Vec<TrackedDeployment>>;

    /// Look up one record; `None` when it is not tracked
    async fn get_by_id(&self, id: &str) -> StoreResult<Option<TrackedDeployment>>;

    /// Delete a record; deleting a missing record succeeds
    async fn remove(&self, id: &str) -> StoreResult<()>;

    /// Records that are still queued or in progress
    async fn list_active(&self) -> StoreResult<Vec<TrackedDeployment>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|td| td.is_active())
            .collect())
    }

    /// Remove every record older than `max_age` and return how many went
    async fn cleanup(&self, max_age: Duration) -> StoreResult<usize> {
        let mut removed = 0;
        for td in self.list().await? {
            if td.is_stale(max_age) {
                self.remove(td.id()).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Check whether a key can safely name a single record
pub(crate) fn is_valid_key(id: &str) -> bool {
    !(id.trim().is_empty()
        || id.contains('/')
        || id.contains('\\')
        || id.contains("..")
        || id.starts_with('.')
        || id.chars().any(char::is_control))
}

/// Reject keys that cannot safely name a single record
///
/// Only writes fail on an invalid key; lookups and removals treat it as a
/// record that is not tracked.
pub(crate) fn validate_key(id: &str) -> StoreResult<()> {
    if !is_valid_key(id) {
        return Err(StoreError::InvalidKey(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("1234567890").is_ok());
        assert!(validate_key("run-1").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(".hidden").is_err());
    }
}
