use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use super::{RunConclusion, RunStatus, Workflow};

/// Local mirror of a remote run's lifecycle, shown on the dashboard
///
/// The record is keyed by the run identifier and is a point-in-time snapshot:
/// it is only ever changed by the reconciliation engine copying an observed
/// status or conclusion onto it.
///
/// Once a conclusion is recorded the deployment is completed and the
/// completion timestamp is fixed; later conclusions never move it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedDeployment {
    id: String,
    run_id: String,
    workflow: Workflow,
    branch: String,
    status: RunStatus,
    conclusion: Option<RunConclusion>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    repo: String,
}

impl TrackedDeployment {
    /// Start tracking a freshly triggered run
    pub fn new(
        run_id: impl Into<String>,
        workflow: Workflow,
        branch: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        let run_id = run_id.into();
        Self {
            id: run_id.clone(),
            run_id,
            workflow,
            branch: branch.into(),
            status: RunStatus::Queued,
            conclusion: None,
            started_at: Utc::now(),
            completed_at: None,
            repo: repo.into(),
        }
    }

    /// Rebuild a record from persisted state without touching any timestamp
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: String,
        run_id: String,
        workflow: Workflow,
        branch: String,
        status: RunStatus,
        conclusion: Option<RunConclusion>,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        repo: String,
    ) -> Self {
        // A concluded record is completed, whatever the stored status says
        let status = if conclusion.is_some() {
            RunStatus::Completed
        } else {
            status
        };
        Self {
            id,
            run_id,
            workflow,
            branch,
            status,
            conclusion,
            started_at,
            completed_at,
            repo,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn conclusion(&self) -> Option<RunConclusion> {
        self.conclusion
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Overwrite the status; used for non-terminal transitions
    pub fn update_status(&mut self, status: RunStatus) {
        self.status = status;
    }

    /// Record the outcome and complete the deployment
    ///
    /// The completion timestamp is stamped on the first call only.
    pub fn update_conclusion(&mut self, conclusion: RunConclusion) {
        self.conclusion = Some(conclusion);
        self.status = RunStatus::Completed;
        self.completed_at.get_or_insert_with(Utc::now);
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_success(&self) -> bool {
        self.conclusion == Some(RunConclusion::Success)
    }

    pub fn is_failed(&self) -> bool {
        self.conclusion == Some(RunConclusion::Failure)
    }

    pub fn is_cancelled(&self) -> bool {
        self.conclusion == Some(RunConclusion::Cancelled)
    }

    /// Time from tracking start to completion, or to now while still running
    pub fn elapsed_time(&self) -> Duration {
        self.elapsed_time_at(Utc::now())
    }

    pub fn elapsed_time_at(&self, now: DateTime<Utc>) -> Duration {
        let end = self.completed_at.unwrap_or(now);
        (end - self.started_at).to_std().unwrap_or_default()
    }

    /// Check whether the record has outlived the retention window
    ///
    /// Completed records age from their completion; records that never
    /// completed age from their start, so abandoned runs are collected too.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.is_stale_at(max_age, Utc::now())
    }

    pub fn is_stale_at(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let reference = match self.completed_at {
            Some(completed_at) if self.is_completed() => completed_at,
            _ => self.started_at,
        };
        match (now - reference).to_std() {
            Ok(age) => age > max_age,
            Err(_) => false,
        }
    }
}

impl fmt::Display for TrackedDeployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.workflow, self.branch)
    }
}
