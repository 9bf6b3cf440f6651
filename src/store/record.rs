use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{RunConclusion, RunStatus, TrackedDeployment, Workflow};

/// On-disk representation of a [`TrackedDeployment`]
///
/// Timestamps are unix seconds. An empty `conclusion` means the run has not
/// concluded; `completed_at` is omitted until it has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRecord {
    pub id: String,
    pub run_id: String,
    pub workflow: String,
    pub branch: String,
    pub status: String,
    #[serde(default)]
    pub conclusion: String,
    pub started_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default)]
    pub repo: String,
}

impl From<&TrackedDeployment> for TrackedRecord {
    fn from(td: &TrackedDeployment) -> Self {
        Self {
            id: td.id().to_string(),
            run_id: td.run_id().to_string(),
            workflow: td.workflow().name().to_string(),
            branch: td.branch().to_string(),
            status: td.status().to_string(),
            conclusion: td.conclusion().map(|c| c.to_string()).unwrap_or_default(),
            started_at: td.started_at().timestamp(),
            completed_at: td.completed_at().map(|at| at.timestamp()),
            repo: td.repo().to_string(),
        }
    }
}

impl TryFrom<TrackedRecord> for TrackedDeployment {
    type Error = String;

    fn try_from(record: TrackedRecord) -> Result<Self, Self::Error> {
        let workflow = Workflow::new(record.workflow).map_err(|e| e.to_string())?;
        let status: RunStatus = record.status.parse()?;
        let conclusion = match record.conclusion.as_str() {
            "" => None,
            other => Some(other.parse::<RunConclusion>()?),
        };
        let started_at = from_unix(record.started_at)?;
        let completed_at = record.completed_at.map(from_unix).transpose()?;

        // Older records carry the run id only
        let id = if record.id.is_empty() {
            record.run_id.clone()
        } else {
            record.id
        };
        if id.is_empty() {
            return Err("record has no id".to_string());
        }

        Ok(TrackedDeployment::restore(
            id,
            record.run_id,
            workflow,
            record.branch,
            status,
            conclusion,
            started_at,
            completed_at,
            record.repo,
        ))
    }
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| format!("timestamp out of range: {secs}"))
}
