//! # Run Source Gateway
//!
//! Contract for the remote system that executes workflows and reports their
//! status. The orchestrator depends on nothing beyond the [`Run`] shape and
//! the three operations of [`RunGateway`].
//!
//! - [`GhCliGateway`] talks to GitHub Actions through the `gh` command line.
//! - [`ResilientGateway`] wraps any gateway with retries and a circuit breaker.
//!
//! Triggering also consults a [`WorkflowCatalog`] to learn which inputs a
//! workflow declares; reconciliation never does.

pub mod gh_cli;
pub mod resilient;
pub mod workflow_spec;

pub use gh_cli::{GhCliGateway, GhCliSettings};
pub use resilient::{ResilientGateway, RetryPolicy};
pub use workflow_spec::parse_dispatch_inputs;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Deployment, Input, Run, Workflow};

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failures talking to the run source
///
/// A run that does not exist is not a failure; see [`RunGateway::get_run`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Timeout after {timeout_ms}ms waiting for {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Invalid response from run source: {0}")]
    Parse(String),

    #[error("Run source unavailable, circuit open for {component}")]
    CircuitOpen { component: String },
}

impl GatewayError {
    /// Create a timeout error for the named operation
    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a parse error for a malformed response
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Check if error is recoverable (worth retrying)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            GatewayError::Timeout { .. } => true,
            GatewayError::CommandFailed { .. } => true,
            // A malformed response will not fix itself on the next attempt
            GatewayError::Parse(_) => false,
            GatewayError::Spawn { .. } => false,
            GatewayError::CircuitOpen { .. } => false,
        }
    }
}

/// Remote execution system that owns [`Run`]s
///
/// Implementations are polled on every refresh, so `get_run` must be cheap
/// to call repeatedly.
#[async_trait]
pub trait RunGateway: Send + Sync {
    /// Current remote state of a run; `None` when the run is not (yet) visible
    async fn get_run(&self, run_id: &str) -> GatewayResult<Option<Run>>;

    /// Best-effort log text for a run
    async fn get_run_logs(&self, run_id: &str) -> GatewayResult<String>;

    /// Start a new remote execution and return the run it created
    async fn create_run(&self, deployment: &Deployment) -> GatewayResult<Run>;
}

/// Workflows a repository can dispatch and the inputs each one declares
///
/// An empty `repo` means the repository of the current checkout.
#[async_trait]
pub trait WorkflowCatalog: Send + Sync {
    /// Active workflows, named by their file
    async fn list_workflows(&self, repo: &str) -> GatewayResult<Vec<Workflow>>;

    /// Dispatch inputs declared by `workflow` at `git_ref`, holding their
    /// defaults; `None` when the workflow does not exist there
    async fn workflow_inputs(
        &self,
        repo: &str,
        workflow: &Workflow,
        git_ref: &str,
    ) -> GatewayResult<Option<Vec<Input>>>;
}
