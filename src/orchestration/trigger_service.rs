//! # Trigger Service
//!
//! Starts a workflow run and begins tracking it: validate the deployment,
//! dispatch it through the run source, then record the created run.
//!
//! When a [`WorkflowCatalog`] is attached, supplied inputs are checked
//! against the inputs the workflow declares at the target branch. Every
//! triggered deployment is written to the [`DeploymentHistory`], if one is
//! attached, so it can be replayed later.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::StatusOrchestrator;
use crate::constants::{operations, DEFAULT_HISTORY_LIMIT};
use crate::domain::{Deployment, Input, Run, TrackedDeployment, Workflow};
use crate::error::{TrackerError, TrackerResult};
use crate::gateway::WorkflowCatalog;
use crate::history::{DeploymentHistory, HistoryEntry};
use crate::logging::log_tracking_operation;

/// Everything needed to dispatch one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub workflow: String,
    pub branch: String,
    #[serde(default)]
    pub inputs: Vec<(String, String)>,
    /// Overrides the service's repository
    #[serde(default)]
    pub repo: Option<String>,
}

impl TriggerRequest {
    pub fn new(workflow: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            branch: branch.into(),
            inputs: Vec::new(),
            repo: None,
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.push((key.into(), value.into()));
        self
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }
}

/// Result of a successful trigger
#[derive(Debug, Clone)]
pub struct TriggerOutcome {
    pub deployment: Deployment,
    pub run: Run,
    pub tracked: TrackedDeployment,
}

#[derive(Clone)]
pub struct TriggerService {
    orchestrator: Arc<StatusOrchestrator>,
    repo: String,
    catalog: Option<Arc<dyn WorkflowCatalog>>,
    history: Option<Arc<dyn DeploymentHistory>>,
    history_limit: usize,
}

impl fmt::Debug for TriggerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerService")
            .field("repo", &self.repo)
            .field("catalog", &self.catalog.is_some())
            .field("history", &self.history.is_some())
            .field("history_limit", &self.history_limit)
            .finish_non_exhaustive()
    }
}

impl TriggerService {
    pub fn new(orchestrator: Arc<StatusOrchestrator>, repo: impl Into<String>) -> Self {
        Self {
            orchestrator,
            repo: repo.into(),
            catalog: None,
            history: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Validate inputs against the workflow's declared inputs
    pub fn with_catalog(mut self, catalog: Arc<dyn WorkflowCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Record triggered deployments, keeping the newest `keep`
    pub fn with_history(mut self, history: Arc<dyn DeploymentHistory>, keep: usize) -> Self {
        self.history = Some(history);
        self.history_limit = keep;
        self
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Build and validate a deployment without dispatching it
    ///
    /// With declared inputs available, unknown keys are rejected and every
    /// value is checked against its declared type. If the declaration cannot
    /// be read, inputs are passed through untyped.
    pub async fn prepare(&self, request: &TriggerRequest) -> TrackerResult<Deployment> {
        let workflow = Workflow::new(request.workflow.as_str())?;
        let repo = request
            .repo
            .as_deref()
            .filter(|repo| !repo.is_empty())
            .unwrap_or(self.repo.as_str());
        let mut deployment = Deployment::new(workflow, request.branch.as_str(), repo)?;

        match self.declared_inputs(&deployment).await {
            Some(declared) => {
                for input in apply_declared(declared, &request.inputs)? {
                    deployment.add_input(input)?;
                }
            }
            None => {
                for (key, value) in &request.inputs {
                    deployment.add_input(Input::string(key.as_str(), value.as_str())?)?;
                }
            }
        }

        deployment.validate_inputs()?;
        Ok(deployment)
    }

    /// Dispatch the deployment and start tracking the run it created
    ///
    /// Gateway failures are returned as-is; nothing is tracked unless the run
    /// source accepted the dispatch.
    pub async fn trigger(&self, request: &TriggerRequest) -> TrackerResult<TriggerOutcome> {
        let deployment = self.prepare(request).await?;
        info!(deployment = %deployment, repo = %deployment.repo(), "🚀 Dispatching deployment");

        let run = self.orchestrator.gateway().create_run(&deployment).await?;
        log_tracking_operation(
            operations::TRIGGER,
            Some(run.id()),
            Some(deployment.workflow().name()),
            "dispatched",
            Some(deployment.branch()),
        );

        let tracked = self
            .orchestrator
            .track_deployment(
                run.id(),
                deployment.workflow().clone(),
                deployment.branch(),
                deployment.repo(),
            )
            .await?;

        self.remember(&deployment, &run).await;

        Ok(TriggerOutcome {
            deployment,
            run,
            tracked,
        })
    }

    /// Trigger a previous deployment again; `None` replays the latest one
    pub async fn replay(&self, id: Option<&str>) -> TrackerResult<TriggerOutcome> {
        let history = self.history()?;
        let entry = match id {
            Some(id) => history.get(id).await?.ok_or_else(|| {
                TrackerError::validation(format!("no deployment with run id {id} in history"))
            })?,
            None => history
                .recent(1)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| TrackerError::validation("deployment history is empty"))?,
        };

        log_tracking_operation(
            operations::REPLAY,
            Some(&entry.id),
            Some(&entry.workflow),
            "replaying",
            Some(&entry.branch),
        );
        self.trigger(&entry.to_request()).await
    }

    /// Recently triggered deployments, newest first
    pub async fn recent(&self, limit: usize) -> TrackerResult<Vec<HistoryEntry>> {
        Ok(self.history()?.recent(limit).await?)
    }

    /// Dispatchable workflows of the configured repository
    pub async fn list_workflows(&self) -> TrackerResult<Vec<Workflow>> {
        Ok(self.catalog()?.list_workflows(&self.repo).await?)
    }

    /// Inputs a workflow declares at `git_ref`; `None` when the workflow is not found
    pub async fn workflow_inputs(
        &self,
        workflow: &str,
        git_ref: &str,
    ) -> TrackerResult<Option<Vec<Input>>> {
        let workflow = Workflow::new(workflow)?;
        Ok(self
            .catalog()?
            .workflow_inputs(&self.repo, &workflow, git_ref)
            .await?)
    }

    fn history(&self) -> TrackerResult<&Arc<dyn DeploymentHistory>> {
        self.history
            .as_ref()
            .ok_or_else(|| TrackerError::configuration("deployment history is not configured"))
    }

    fn catalog(&self) -> TrackerResult<&Arc<dyn WorkflowCatalog>> {
        self.catalog
            .as_ref()
            .ok_or_else(|| TrackerError::configuration("workflow catalog is not configured"))
    }

    async fn declared_inputs(&self, deployment: &Deployment) -> Option<Vec<Input>> {
        let catalog = self.catalog.as_ref()?;
        match catalog
            .workflow_inputs(deployment.repo(), deployment.workflow(), deployment.branch())
            .await
        {
            Ok(declared) => declared,
            Err(e) => {
                warn!(
                    workflow = %deployment.workflow(),
                    error = %e,
                    "Could not read declared workflow inputs; sending inputs untyped"
                );
                None
            }
        }
    }

    // History is best effort; the run is already dispatched and tracked
    async fn remember(&self, deployment: &Deployment, run: &Run) {
        let Some(history) = &self.history else {
            return;
        };

        if let Err(e) = history.record(&HistoryEntry::new(deployment, run)).await {
            warn!(run_id = %run.id(), error = %e, "Failed to record deployment history");
            return;
        }
        match history.prune(self.history_limit).await {
            Ok(0) => {}
            Ok(pruned) => debug!(pruned = pruned, "Pruned deployment history"),
            Err(e) => warn!(error = %e, "Failed to prune deployment history"),
        }
    }
}

/// Fill declared inputs with the supplied values
///
/// Inputs left empty are not sent, so the workflow applies its own default.
fn apply_declared(
    mut declared: Vec<Input>,
    supplied: &[(String, String)],
) -> TrackerResult<Vec<Input>> {
    for (key, value) in supplied {
        let input = declared
            .iter_mut()
            .find(|input| input.key() == key.as_str())
            .ok_or_else(|| {
                TrackerError::validation(format!("workflow does not declare input {key:?}"))
            })?;
        input.set_value(value.as_str())?;
    }

    for input in &declared {
        input.validate()?;
    }
    Ok(declared
        .into_iter()
        .filter(|input| !input.value().is_empty())
        .collect())
}
