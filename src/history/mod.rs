//! # Deployment History
//!
//! A log of the deployments this tool has triggered, kept so a previous
//! deployment can be replayed with the same workflow, branch and inputs.
//!
//! History is separate from the tracked-run store: tracked records are
//! garbage collected once their run completes, while history entries stay
//! until they fall out of the newest `max_entries`.
//!
//! - [`FileDeploymentHistory`]: one JSON file per entry, written atomically.
//! - [`InMemoryDeploymentHistory`]: a concurrent map, for tests.

pub mod file_history;
pub mod memory_history;

pub use file_history::FileDeploymentHistory;
pub use memory_history::InMemoryDeploymentHistory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{Deployment, Run};
use crate::orchestration::TriggerRequest;
use crate::store::StoreResult;

/// One triggered deployment, keyed by the id of the run it created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub workflow: String,
    pub branch: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    pub triggered_at: DateTime<Utc>,
    #[serde(default)]
    pub url: String,
}

impl HistoryEntry {
    pub fn new(deployment: &Deployment, run: &Run) -> Self {
        Self {
            id: run.id().to_string(),
            workflow: deployment.workflow().name().to_string(),
            branch: deployment.branch().to_string(),
            repo: deployment.repo().to_string(),
            inputs: deployment.inputs_map().into_iter().collect(),
            triggered_at: deployment.created_at(),
            url: run.url().to_string(),
        }
    }

    /// `owner/repo/workflow @ branch`
    pub fn label(&self) -> String {
        if self.repo.is_empty() {
            format!("{} @ {}", self.workflow, self.branch)
        } else {
            format!("{}/{} @ {}", self.repo, self.workflow, self.branch)
        }
    }

    /// A request that dispatches this deployment again
    pub fn to_request(&self) -> TriggerRequest {
        let request = self
            .inputs
            .iter()
            .fold(TriggerRequest::new(&self.workflow, &self.branch), |req, (k, v)| {
                req.with_input(k, v)
            });
        if self.repo.is_empty() {
            request
        } else {
            request.with_repo(&self.repo)
        }
    }

    /// Newest first; entries triggered at the same instant order by id
    pub(crate) fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.triggered_at
            .cmp(&a.triggered_at)
            .then_with(|| b.id.cmp(&a.id))
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [run {}] {}",
            self.label(),
            self.id,
            self.triggered_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Persistence for triggered deployments
#[async_trait]
pub trait DeploymentHistory: Send + Sync {
    /// Insert or overwrite the entry with the same id
    async fn record(&self, entry: &HistoryEntry) -> StoreResult<()>;

    async fn get(&self, id: &str) -> StoreResult<Option<HistoryEntry>>;

    /// At most `limit` entries, newest first
    async fn recent(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>>;

    /// Deleting a missing entry succeeds
    async fn remove(&self, id: &str) -> StoreResult<()>;

    /// Drop everything but the newest `keep` entries and return how many went
    async fn prune(&self, keep: usize) -> StoreResult<usize> {
        let stale: Vec<HistoryEntry> = self
            .recent(usize::MAX)
            .await?
            .into_iter()
            .skip(keep)
            .collect();
        for entry in &stale {
            self.remove(&entry.id).await?;
        }
        Ok(stale.len())
    }
}
