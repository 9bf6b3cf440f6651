//! Shared helpers for integration tests

#![allow(dead_code)]

pub mod strategies;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deploy_tracker::domain::{
    Deployment, Input, Run, RunConclusion, RunStatus, TrackedDeployment, Workflow,
};
use deploy_tracker::gateway::{GatewayError, GatewayResult, RunGateway, WorkflowCatalog};
use deploy_tracker::store::TrackedRecord;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What the scripted run source answers for one run id
#[derive(Debug, Clone)]
pub enum Scripted {
    Run(Run),
    Fail,
    Hang,
}

/// In-process run source whose answers are set by the test
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    script: Mutex<HashMap<String, Scripted>>,
    logs: Mutex<HashMap<String, String>>,
    declared: Mutex<HashMap<String, Vec<Input>>>,
    dispatched: Mutex<Vec<Deployment>>,
    get_run_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, run: Run) {
        self.script
            .lock()
            .insert(run.id().to_string(), Scripted::Run(run));
    }

    pub fn report_status(&self, run_id: &str, status: RunStatus) {
        self.report(Run::new(run_id, 1, status, "main", ""));
    }

    pub fn report_conclusion(&self, run_id: &str, conclusion: RunConclusion) {
        self.report(Run::new(run_id, 1, RunStatus::InProgress, "main", "").with_conclusion(conclusion));
    }

    pub fn fail(&self, run_id: &str) {
        self.script.lock().insert(run_id.to_string(), Scripted::Fail);
    }

    pub fn hang(&self, run_id: &str) {
        self.script.lock().insert(run_id.to_string(), Scripted::Hang);
    }

    pub fn set_logs(&self, run_id: &str, logs: &str) {
        self.logs.lock().insert(run_id.to_string(), logs.to_string());
    }

    /// Make `workflow` declare these dispatch inputs
    pub fn declare_inputs(&self, workflow: &str, inputs: Vec<Input>) {
        self.declared.lock().insert(workflow.to_string(), inputs);
    }

    pub fn get_run_calls(&self) -> usize {
        self.get_run_calls.load(Ordering::SeqCst)
    }

    /// Deployments accepted by `create_run`, oldest first
    pub fn dispatched(&self) -> Vec<Deployment> {
        self.dispatched.lock().clone()
    }
}

#[async_trait]
impl RunGateway for ScriptedGateway {
    async fn get_run(&self, run_id: &str) -> GatewayResult<Option<Run>> {
        self.get_run_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().get(run_id).cloned();
        match scripted {
            Some(Scripted::Run(run)) => Ok(Some(run)),
            Some(Scripted::Fail) => Err(GatewayError::CommandFailed {
                command: format!("gh run view {run_id}"),
                stderr: "HTTP 503: Service Unavailable".to_string(),
            }),
            Some(Scripted::Hang) => {
                std::future::pending::<()>().await;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn get_run_logs(&self, run_id: &str) -> GatewayResult<String> {
        self.logs
            .lock()
            .get(run_id)
            .cloned()
            .ok_or_else(|| GatewayError::CommandFailed {
                command: format!("gh run view {run_id} --log"),
                stderr: "log not found".to_string(),
            })
    }

    async fn create_run(&self, deployment: &Deployment) -> GatewayResult<Run> {
        let number = {
            let mut dispatched = self.dispatched.lock();
            dispatched.push(deployment.clone());
            dispatched.len()
        };
        let run = Run::new(
            format!("run-created-{number}"),
            number as u64,
            RunStatus::Queued,
            deployment.branch(),
            "",
        );
        self.report(run.clone());
        Ok(run)
    }
}

#[async_trait]
impl WorkflowCatalog for ScriptedGateway {
    async fn list_workflows(&self, _repo: &str) -> GatewayResult<Vec<Workflow>> {
        let mut names: Vec<String> = self.declared.lock().keys().cloned().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| Workflow::new(name).map_err(|e| GatewayError::parse(e.to_string())))
            .collect()
    }

    async fn workflow_inputs(
        &self,
        _repo: &str,
        workflow: &Workflow,
        _git_ref: &str,
    ) -> GatewayResult<Option<Vec<Input>>> {
        Ok(self.declared.lock().get(workflow.name()).cloned())
    }
}

/// Build a stored record with explicit timestamps
pub fn record(
    id: &str,
    status: RunStatus,
    conclusion: Option<RunConclusion>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
) -> TrackedDeployment {
    TrackedDeployment::try_from(TrackedRecord {
        id: id.to_string(),
        run_id: id.to_string(),
        workflow: "deploy.yml".to_string(),
        branch: "main".to_string(),
        status: status.to_string(),
        conclusion: conclusion.map(|c| c.to_string()).unwrap_or_default(),
        started_at: started_at.timestamp(),
        completed_at: completed_at.map(|at| at.timestamp()),
        repo: "owner/repo".to_string(),
    })
    .expect("valid record")
}

/// A record that finished successfully `age` ago
pub fn completed_ago(id: &str, age: Duration) -> TrackedDeployment {
    let completed = Utc::now() - chrono::Duration::from_std(age).expect("age in range");
    record(
        id,
        RunStatus::Completed,
        Some(RunConclusion::Success),
        completed - chrono::Duration::minutes(5),
        Some(completed),
    )
}

/// A record still in progress that started `age` ago
pub fn active_since(id: &str, age: Duration) -> TrackedDeployment {
    let started = Utc::now() - chrono::Duration::from_std(age).expect("age in range");
    record(id, RunStatus::InProgress, None, started, None)
}
