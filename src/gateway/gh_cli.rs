//! GitHub Actions run source backed by the `gh` command line.
//!
//! Every invocation is bounded by a timeout and the child process is killed
//! if the future driving it is dropped, so a cancelled refresh never leaves
//! `gh` processes behind.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

use super::{parse_dispatch_inputs, GatewayError, GatewayResult, RunGateway, WorkflowCatalog};
use crate::constants::DEFAULT_COMMAND_TIMEOUT;
use crate::domain::{Deployment, Input, Run, RunConclusion, RunStatus, Workflow};
use crate::logging::log_gateway_call;

const RUN_VIEW_FIELDS: &str =
    "databaseId,number,status,conclusion,headBranch,createdAt,startedAt,updatedAt,url";

/// Connection settings for [`GhCliGateway`]
#[derive(Debug, Clone)]
pub struct GhCliSettings {
    /// Repository in `owner/repo` form; empty uses the current checkout
    pub repo: String,
    /// Program to execute, normally `gh`
    pub gh_binary: String,
    /// Upper bound for a single `gh` invocation
    pub command_timeout: Duration,
    /// Pause between dispatching a workflow and looking up the run it created
    pub trigger_settle_delay: Duration,
}

impl GhCliSettings {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            gh_binary: "gh".to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            trigger_settle_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GhCliGateway {
    settings: GhCliSettings,
}

impl GhCliGateway {
    pub fn new(settings: GhCliSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GhCliSettings {
        &self.settings
    }

    /// Run `gh` with `args`, returning its raw output whatever the exit status
    async fn exec(&self, operation: &str, args: &[String]) -> GatewayResult<Output> {
        let mut command = tokio::process::Command::new(&self.settings.gh_binary);
        command
            .args(args)
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(program = %self.settings.gh_binary, args = ?args, "Invoking run source command");

        timeout(self.settings.command_timeout, command.output())
            .await
            .map_err(|_| GatewayError::timeout(operation, self.settings.command_timeout))?
            .map_err(|source| GatewayError::Spawn {
                program: self.settings.gh_binary.clone(),
                source,
            })
    }

    /// Like [`exec`](Self::exec) but a non-zero exit becomes an error
    async fn exec_checked(&self, operation: &str, args: &[String]) -> GatewayResult<Vec<u8>> {
        let output = self.exec(operation, args).await?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(self.command_failed(args, &output))
        }
    }

    fn command_failed(&self, args: &[String], output: &Output) -> GatewayError {
        GatewayError::CommandFailed {
            command: format!("{} {}", self.settings.gh_binary, args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// `repo`, else the configured repo; with neither, `gh` resolves the
    /// repository from the current checkout
    fn repo_args(&self, repo: &str) -> Vec<String> {
        let repo = if repo.is_empty() {
            self.settings.repo.as_str()
        } else {
            repo
        };
        if repo.is_empty() {
            Vec::new()
        } else {
            vec!["--repo".to_string(), repo.to_string()]
        }
    }

    async fn latest_run_id(&self, repo: &str, workflow: &str) -> GatewayResult<String> {
        let mut args = vec!["run".to_string(), "list".to_string()];
        args.extend(self.repo_args(repo));
        args.extend(
            [
                "--workflow",
                workflow,
                "--limit",
                "1",
                "--json",
                "databaseId",
                "-q",
                ".[0].databaseId",
            ]
            .map(String::from),
        );

        let stdout = self.exec_checked("list_runs", &args).await?;
        let id = String::from_utf8_lossy(&stdout)
            .trim()
            .trim_matches('"')
            .to_string();
        if id.is_empty() || id == "null" {
            return Err(GatewayError::parse(format!(
                "no run found for workflow {workflow}"
            )));
        }
        Ok(id)
    }
}

#[async_trait]
impl RunGateway for GhCliGateway {
    async fn get_run(&self, run_id: &str) -> GatewayResult<Option<Run>> {
        let started = Instant::now();
        let mut args = vec!["run".to_string(), "view".to_string(), run_id.to_string()];
        args.extend(self.repo_args(""));
        args.extend(["--json".to_string(), RUN_VIEW_FIELDS.to_string()]);

        let output = self.exec("get_run", &args).await?;
        if !output.status.success() {
            if is_not_found(&output.stderr) {
                log_gateway_call("get_run", Some(run_id), started.elapsed(), "not_found");
                return Ok(None);
            }
            log_gateway_call("get_run", Some(run_id), started.elapsed(), "failed");
            return Err(self.command_failed(&args, &output));
        }

        let run = parse_run_view(&output.stdout)?;
        log_gateway_call("get_run", Some(run_id), started.elapsed(), &run.status().to_string());
        Ok(Some(run))
    }

    async fn get_run_logs(&self, run_id: &str) -> GatewayResult<String> {
        let started = Instant::now();
        let mut args = vec!["run".to_string(), "view".to_string(), run_id.to_string()];
        args.extend(self.repo_args(""));
        args.push("--log".to_string());

        let stdout = self.exec_checked("get_run_logs", &args).await?;
        log_gateway_call("get_run_logs", Some(run_id), started.elapsed(), "ok");
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    async fn create_run(&self, deployment: &Deployment) -> GatewayResult<Run> {
        let started = Instant::now();
        let workflow = deployment.workflow().name();
        let mut args = vec![
            "workflow".to_string(),
            "run".to_string(),
            workflow.to_string(),
        ];
        args.extend(self.repo_args(deployment.repo()));
        args.extend(["-r".to_string(), deployment.branch().to_string()]);
        for (key, value) in deployment.inputs_map() {
            args.extend(["--input".to_string(), format!("{key}={value}")]);
        }

        self.exec_checked("create_run", &args).await?;

        // The dispatch API does not return the run it created
        tokio::time::sleep(self.settings.trigger_settle_delay).await;
        let run_id = self.latest_run_id(deployment.repo(), workflow).await?;
        log_gateway_call("create_run", Some(&run_id), started.elapsed(), "dispatched");

        match self.get_run(&run_id).await? {
            Some(run) => Ok(run),
            None => Ok(Run::new(
                run_id,
                0,
                RunStatus::Queued,
                deployment.branch(),
                "",
            )),
        }
    }
}

#[async_trait]
impl WorkflowCatalog for GhCliGateway {
    async fn list_workflows(&self, repo: &str) -> GatewayResult<Vec<Workflow>> {
        let started = Instant::now();
        let mut args = vec!["workflow".to_string(), "list".to_string()];
        args.extend(self.repo_args(repo));
        args.extend(["--json".to_string(), "name,path,state".to_string()]);

        let stdout = self.exec_checked("list_workflows", &args).await?;
        let workflows = parse_workflow_list(&stdout)?;
        log_gateway_call("list_workflows", None, started.elapsed(), "ok");
        Ok(workflows)
    }

    async fn workflow_inputs(
        &self,
        repo: &str,
        workflow: &Workflow,
        git_ref: &str,
    ) -> GatewayResult<Option<Vec<Input>>> {
        let started = Instant::now();
        let mut args = vec![
            "workflow".to_string(),
            "view".to_string(),
            workflow.name().to_string(),
            "--yaml".to_string(),
        ];
        args.extend(self.repo_args(repo));
        if !git_ref.is_empty() {
            args.extend(["--ref".to_string(), git_ref.to_string()]);
        }

        let output = self.exec("workflow_inputs", &args).await?;
        if !output.status.success() {
            if is_not_found(&output.stderr) {
                log_gateway_call("workflow_inputs", None, started.elapsed(), "not_found");
                return Ok(None);
            }
            return Err(self.command_failed(&args, &output));
        }

        let inputs = parse_dispatch_inputs(&String::from_utf8_lossy(&output.stdout))?;
        log_gateway_call("workflow_inputs", None, started.elapsed(), "ok");
        Ok(Some(inputs))
    }
}

#[derive(Debug, Deserialize)]
struct GhWorkflowEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    state: String,
}

/// Active workflows from `gh workflow list --json name,path,state`
pub(crate) fn parse_workflow_list(data: &[u8]) -> GatewayResult<Vec<Workflow>> {
    let entries: Vec<GhWorkflowEntry> = serde_json::from_slice(data)
        .map_err(|e| GatewayError::parse(format!("workflow list: {e}")))?;

    Ok(entries
        .into_iter()
        .filter(|entry| entry.state == "active")
        .filter_map(|entry| {
            // Dispatch by file name; fall back to the display name
            let file = entry.path.rsplit('/').next().unwrap_or_default();
            let name = if file.is_empty() { entry.name } else { file.to_string() };
            Workflow::new(name).ok()
        })
        .collect())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RunIdValue {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhRunView {
    database_id: RunIdValue,
    #[serde(default)]
    number: u64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    head_branch: Option<String>,
    created_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    url: Option<String>,
}

/// Build a [`Run`] from `gh run view --json` output
pub(crate) fn parse_run_view(data: &[u8]) -> GatewayResult<Run> {
    let view: GhRunView = serde_json::from_slice(data)
        .map_err(|e| GatewayError::parse(format!("run view: {e}")))?;

    let id = match view.database_id {
        RunIdValue::Number(n) => n.to_string(),
        RunIdValue::Text(s) if !s.is_empty() => s,
        RunIdValue::Text(_) => return Err(GatewayError::parse("run view: empty databaseId")),
    };

    let status = parse_status(view.status.as_deref().unwrap_or_default());
    let mut run = Run::new(
        id,
        view.number,
        status,
        view.head_branch.unwrap_or_default(),
        view.url.unwrap_or_default(),
    );
    if status == RunStatus::Completed {
        if let Some(conclusion) = parse_conclusion(view.conclusion.as_deref().unwrap_or_default()) {
            run = run.with_conclusion(conclusion);
        }
    }

    let completed_at = if status == RunStatus::Completed {
        view.updated_at.and_then(present)
    } else {
        None
    };
    let created_at = view.created_at.and_then(present).unwrap_or_else(Utc::now);
    Ok(run.with_timestamps(created_at, view.started_at.and_then(present), completed_at))
}

/// Map a GitHub run status onto [`RunStatus`]
pub(crate) fn parse_status(raw: &str) -> RunStatus {
    match raw {
        "queued" | "waiting" | "requested" | "pending" => RunStatus::Queued,
        "in_progress" => RunStatus::InProgress,
        "completed" => RunStatus::Completed,
        _ => RunStatus::Unknown,
    }
}

/// Map a GitHub run conclusion onto [`RunConclusion`]; empty means none yet
pub(crate) fn parse_conclusion(raw: &str) -> Option<RunConclusion> {
    let conclusion = match raw {
        "" => return None,
        "success" => RunConclusion::Success,
        "failure" | "timed_out" | "startup_failure" => RunConclusion::Failure,
        "cancelled" => RunConclusion::Cancelled,
        "neutral" => RunConclusion::Neutral,
        "skipped" => RunConclusion::Skipped,
        _ => RunConclusion::Unknown,
    };
    Some(conclusion)
}

// gh reports unset timestamps as 0001-01-01T00:00:00Z
fn present(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (at.year() > 1970).then_some(at)
}

fn is_not_found(stderr: &[u8]) -> bool {
    let text = String::from_utf8_lossy(stderr).to_lowercase();
    text.contains("not found") || text.contains("could not find")
}
