use async_trait::async_trait;
use dashmap::DashMap;

use super::{DeploymentHistory, HistoryEntry};
use crate::store::{is_valid_key, validate_key, StoreResult};

/// Process-local history backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryDeploymentHistory {
    entries: DashMap<String, HistoryEntry>,
}

impl InMemoryDeploymentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DeploymentHistory for InMemoryDeploymentHistory {
    async fn record(&self, entry: &HistoryEntry) -> StoreResult<()> {
        validate_key(&entry.id)?;
        self.entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<HistoryEntry>> {
        if !is_valid_key(id) {
            return Ok(None);
        }
        Ok(self.entries.get(id).map(|entry| entry.value().clone()))
    }

    async fn recent(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        let mut entries: Vec<HistoryEntry> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(HistoryEntry::newest_first);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn remove(&self, id: &str) -> StoreResult<()> {
        if is_valid_key(id) {
            self.entries.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn entry(id: &str, at_secs: i64) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            workflow: "deploy.yml".to_string(),
            branch: "main".to_string(),
            repo: String::new(),
            inputs: BTreeMap::new(),
            triggered_at: Utc.timestamp_opt(at_secs, 0).unwrap(),
            url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_prune_keeps_newest() {
        let history = InMemoryDeploymentHistory::new();
        for (id, at) in [("1", 100), ("2", 200), ("3", 300), ("4", 400)] {
            history.record(&entry(id, at)).await.unwrap();
        }

        assert_eq!(history.prune(2).await.unwrap(), 2);
        let ids: Vec<String> = history
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["4", "3"]);
        assert_eq!(history.prune(5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_same_instant_orders_by_id() {
        let history = InMemoryDeploymentHistory::new();
        history.record(&entry("10", 100)).await.unwrap();
        history.record(&entry("11", 100)).await.unwrap();
        let recent = history.recent(1).await.unwrap();
        assert_eq!(recent[0].id, "11");
    }
}
