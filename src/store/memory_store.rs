use async_trait::async_trait;
use dashmap::DashMap;

use super::{is_valid_key, validate_key, StoreResult, TrackerStore};
use crate::domain::TrackedDeployment;

/// Process-local store backed by a concurrent map
///
/// Nothing survives the process; useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryTrackerStore {
    records: DashMap<String, TrackedDeployment>,
}

impl InMemoryTrackerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl TrackerStore for InMemoryTrackerStore {
    async fn save(&self, tracked: &TrackedDeployment) -> StoreResult<()> {
        validate_key(tracked.id())?;
        self.records
            .insert(tracked.id().to_string(), tracked.clone());
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<TrackedDeployment>> {
        Ok(self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<TrackedDeployment>> {
        if !is_valid_key(id) {
            return Ok(None);
        }
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn remove(&self, id: &str) -> StoreResult<()> {
        if is_valid_key(id) {
            self.records.remove(id);
        }
        Ok(())
    }

    async fn list_active(&self) -> StoreResult<Vec<TrackedDeployment>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.value().is_active())
            .map(|entry| entry.value().clone())
            .collect())
    }
}
