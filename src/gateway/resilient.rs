//! Retry and circuit-breaking decorator for any [`RunGateway`] or
//! [`WorkflowCatalog`].

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use super::{GatewayError, GatewayResult, RunGateway, WorkflowCatalog};
use crate::domain::{Deployment, Input, Run, Workflow};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

/// Retry budget for idempotent gateway reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based), doubling each time
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Wraps a gateway so polling stops hammering an unreachable run source
///
/// `get_run` and `get_run_logs` are retried with exponential backoff on
/// recoverable failures. `create_run` goes through the breaker but is never
/// retried, since a repeated dispatch would start a second deployment.
/// Workflow catalog reads share the same breaker and retry budget.
pub struct ResilientGateway<G> {
    inner: G,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl<G> ResilientGateway<G> {
    pub fn new(inner: G, breaker_config: CircuitBreakerConfig, retry: RetryPolicy) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new("run_source", breaker_config),
            retry,
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn guarded<T, F, Fut>(&self, operation: F) -> GatewayResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        self.breaker
            .call(operation, GatewayError::is_recoverable)
            .await
            .map_err(|e| match e {
                CircuitBreakerError::CircuitOpen { component } => {
                    GatewayError::CircuitOpen { component }
                }
                CircuitBreakerError::OperationFailed(inner) => inner,
            })
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &str,
        target: &str,
        mut attempt_fn: F,
    ) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut retries = 0;

        loop {
            match self.guarded(&mut attempt_fn).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_recoverable() && retries < self.retry.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        operation = %operation,
                        target = %target,
                        retry = retries,
                        error = %e,
                        "Retrying run source call"
                    );

                    tokio::time::sleep(self.retry.delay_for(retries)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<G: RunGateway> RunGateway for ResilientGateway<G> {
    async fn get_run(&self, run_id: &str) -> GatewayResult<Option<Run>> {
        self.with_retry("get_run", run_id, || self.inner.get_run(run_id))
            .await
    }

    async fn get_run_logs(&self, run_id: &str) -> GatewayResult<String> {
        self.with_retry("get_run_logs", run_id, || self.inner.get_run_logs(run_id))
            .await
    }

    async fn create_run(&self, deployment: &Deployment) -> GatewayResult<Run> {
        self.guarded(|| self.inner.create_run(deployment)).await
    }
}

#[async_trait]
impl<G: WorkflowCatalog> WorkflowCatalog for ResilientGateway<G> {
    async fn list_workflows(&self, repo: &str) -> GatewayResult<Vec<Workflow>> {
        self.with_retry("list_workflows", repo, || self.inner.list_workflows(repo))
            .await
    }

    async fn workflow_inputs(
        &self,
        repo: &str,
        workflow: &Workflow,
        git_ref: &str,
    ) -> GatewayResult<Option<Vec<Input>>> {
        self.with_retry("workflow_inputs", workflow.name(), || {
            self.inner.workflow_inputs(repo, workflow, git_ref)
        })
        .await
    }
}
