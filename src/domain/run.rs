use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a remote workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Waiting for a runner
    Queued,
    /// Currently executing
    InProgress,
    /// Finished; the conclusion carries the outcome
    Completed,
    /// The run source reported something we do not recognise
    Unknown,
}

impl RunStatus {
    /// Check if the run still needs to be watched
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::InProgress)
    }

    /// Check if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Queued
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Invalid run status: {s}")),
        }
    }
}

/// Final outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    Success,
    Failure,
    Cancelled,
    Neutral,
    Skipped,
    Unknown,
}

impl fmt::Display for RunConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Neutral => write!(f, "neutral"),
            Self::Skipped => write!(f, "skipped"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for RunConclusion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "cancelled" => Ok(Self::Cancelled),
            "neutral" => Ok(Self::Neutral),
            "skipped" => Ok(Self::Skipped),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Invalid run conclusion: {s}")),
        }
    }
}

/// Snapshot of a workflow run as reported by the run source
///
/// The local system never mutates a `Run`; it only reads snapshots and copies
/// the observed state onto its own [`TrackedDeployment`](super::TrackedDeployment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    id: String,
    number: u64,
    status: RunStatus,
    conclusion: Option<RunConclusion>,
    branch: String,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    url: String,
}

impl Run {
    /// Create a run snapshot without a conclusion
    pub fn new(
        id: impl Into<String>,
        number: u64,
        status: RunStatus,
        branch: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            number,
            status,
            conclusion: None,
            branch: branch.into(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            url: url.into(),
        }
    }

    /// Mark the snapshot as completed with the given outcome
    pub fn with_conclusion(mut self, conclusion: RunConclusion) -> Self {
        self.status = RunStatus::Completed;
        self.conclusion = Some(conclusion);
        self
    }

    /// Attach the remote timestamps
    pub fn with_timestamps(
        mut self,
        created_at: DateTime<Utc>,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.started_at = started_at;
        self.completed_at = completed_at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Outcome of the run; only ever `Some` once the status is completed
    pub fn conclusion(&self) -> Option<RunConclusion> {
        if self.status.is_terminal() {
            self.conclusion
        } else {
            None
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_success(&self) -> bool {
        self.conclusion() == Some(RunConclusion::Success)
    }

    pub fn is_failed(&self) -> bool {
        self.conclusion() == Some(RunConclusion::Failure)
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.number, self.id)
    }
}
