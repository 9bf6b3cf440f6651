//! # Status Orchestrator
//!
//! Reconciles locally tracked deployments with the run source.
//!
//! ## Overview
//!
//! The orchestrator owns no state of its own. It reads records from a
//! [`TrackerStore`], asks a [`RunGateway`] for the current state of every
//! record that is still active, copies what it observed onto the record,
//! persists the result, and garbage collects records past the retention
//! window.
//!
//! ## Failure Policy
//!
//! - A gateway error or timeout for one record is logged and the last known
//!   record is returned unchanged. Tracked work never disappears from a
//!   listing because the run source is unreachable.
//! - A failed save during a refresh is logged; the caller still sees the
//!   refreshed record.
//! - Garbage collection after a listing is best effort.
//! - Log retrieval has no local fallback, so its errors are returned.
//!
//! ## Applying Observations
//!
//! See [`apply_observation`]. Completed records are never touched again, an
//! `unknown` status is ignored, and a `completed` status without a
//! conclusion is left for a later refresh rather than guessed.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::{
    operations, DEFAULT_GATEWAY_TIMEOUT, DEFAULT_REFRESH_CONCURRENCY, DEFAULT_RETENTION,
};
use crate::domain::{Run, RunStatus, TrackedDeployment, Workflow};
use crate::error::TrackerResult;
use crate::gateway::{GatewayError, RunGateway};
use crate::logging::log_tracking_operation;
use crate::store::TrackerStore;

/// Tuning for a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Records older than this are removed after each listing
    pub retention: Duration,
    /// Deadline for a single gateway call
    pub gateway_timeout: Duration,
    /// Active records refreshed at once; 1 refreshes sequentially
    pub refresh_concurrency: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            refresh_concurrency: DEFAULT_REFRESH_CONCURRENCY,
        }
    }
}

pub struct StatusOrchestrator {
    store: Arc<dyn TrackerStore>,
    gateway: Arc<dyn RunGateway>,
    settings: ReconcileSettings,
}

impl std::fmt::Debug for StatusOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusOrchestrator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl StatusOrchestrator {
    pub fn new(store: Arc<dyn TrackerStore>, gateway: Arc<dyn RunGateway>) -> Self {
        Self::with_settings(store, gateway, ReconcileSettings::default())
    }

    pub fn with_settings(
        store: Arc<dyn TrackerStore>,
        gateway: Arc<dyn RunGateway>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn TrackerStore> {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<dyn RunGateway> {
        &self.gateway
    }

    /// Every tracked deployment, with active ones refreshed from the run source
    ///
    /// Records are returned newest first. The listing reflects the store as it
    /// was before the trailing garbage collection pass.
    pub async fn list_tracked(&self) -> TrackerResult<Vec<TrackedDeployment>> {
        let records = self.store.list().await?;
        let active = records.iter().filter(|td| td.is_active()).count();

        let mut tracked: Vec<TrackedDeployment> = stream::iter(records)
            .map(|td| self.refresh(td))
            .buffer_unordered(self.settings.refresh_concurrency.max(1))
            .collect()
            .await;

        debug!(
            total = tracked.len(),
            refreshed = active,
            "Refreshed tracked deployments"
        );

        if let Err(e) = self.cleanup_stale().await {
            warn!(error = %e, "Stale deployment cleanup failed");
        }

        tracked.sort_by(|a, b| {
            b.started_at()
                .cmp(&a.started_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(tracked)
    }

    /// Active deployments as last stored, without contacting the run source
    pub async fn list_active(&self) -> TrackerResult<Vec<TrackedDeployment>> {
        Ok(self.store.list_active().await?)
    }

    /// Start tracking a run that was just triggered
    pub async fn track_deployment(
        &self,
        run_id: &str,
        workflow: Workflow,
        branch: &str,
        repo: &str,
    ) -> TrackerResult<TrackedDeployment> {
        let td = TrackedDeployment::new(run_id, workflow, branch, repo);
        self.store.save(&td).await?;

        log_tracking_operation(
            operations::TRACK,
            Some(td.run_id()),
            Some(td.workflow().name()),
            "tracked",
            Some(branch),
        );
        Ok(td)
    }

    /// One tracked deployment, refreshed first if it is still active
    pub async fn get_tracked(&self, id: &str) -> TrackerResult<Option<TrackedDeployment>> {
        match self.store.get_by_id(id).await? {
            Some(td) => Ok(Some(self.refresh(td).await)),
            None => Ok(None),
        }
    }

    /// Stop tracking a deployment; dismissing an unknown id succeeds
    pub async fn dismiss_tracked(&self, id: &str) -> TrackerResult<()> {
        self.store.remove(id).await?;
        log_tracking_operation(operations::DISMISS, Some(id), None, "dismissed", None);
        Ok(())
    }

    /// Log text for a run, straight from the run source
    pub async fn get_run_logs(&self, run_id: &str) -> TrackerResult<String> {
        let timeout = self.settings.gateway_timeout;
        let logs = tokio::time::timeout(timeout, self.gateway.get_run_logs(run_id))
            .await
            .map_err(|_| GatewayError::timeout("get_run_logs", timeout))??;
        Ok(logs)
    }

    /// Remove records older than the retention window
    pub async fn cleanup_stale(&self) -> TrackerResult<usize> {
        let removed = self.store.cleanup(self.settings.retention).await?;
        if removed > 0 {
            info!(
                removed = removed,
                retention_secs = self.settings.retention.as_secs(),
                "🧹 Removed stale tracked deployments"
            );
            log_tracking_operation(
                operations::CLEANUP,
                None,
                None,
                "completed",
                Some(&format!("removed {removed}")),
            );
        }
        Ok(removed)
    }

    /// Refresh one record against the run source and persist any change
    async fn refresh(&self, mut td: TrackedDeployment) -> TrackedDeployment {
        if !td.is_active() {
            return td;
        }

        let Some(run) = self.observe(td.run_id()).await else {
            return td;
        };

        let before = td.status();
        if apply_observation(&mut td, &run) {
            match self.store.save(&td).await {
                Ok(()) => log_tracking_operation(
                    operations::REFRESH,
                    Some(td.run_id()),
                    Some(td.workflow().name()),
                    &td.status().to_string(),
                    Some(&format!("was {before}")),
                ),
                Err(e) => warn!(
                    run_id = %td.run_id(),
                    error = %e,
                    "Failed to persist refreshed deployment"
                ),
            }
        }
        td
    }

    /// Ask the run source for a run, absorbing every failure
    async fn observe(&self, run_id: &str) -> Option<Run> {
        let timeout = self.settings.gateway_timeout;
        match tokio::time::timeout(timeout, self.gateway.get_run(run_id)).await {
            Ok(Ok(Some(run))) => Some(run),
            Ok(Ok(None)) => {
                debug!(run_id = %run_id, "Run not visible at run source yet");
                None
            }
            Ok(Err(e)) => {
                warn!(run_id = %run_id, error = %e, "Run source lookup failed, keeping last known state");
                None
            }
            Err(_) => {
                warn!(
                    run_id = %run_id,
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "Run source lookup timed out, keeping last known state"
                );
                None
            }
        }
    }
}

/// Copy an observed run state onto a tracked deployment
///
/// Returns whether the record changed.
pub fn apply_observation(td: &mut TrackedDeployment, run: &Run) -> bool {
    if td.is_completed() {
        return false;
    }

    match run.status() {
        RunStatus::Unknown => false,
        RunStatus::Completed => match run.conclusion() {
            Some(conclusion) => {
                td.update_conclusion(conclusion);
                true
            }
            // Completed without an outcome: wait for a fuller response
            None => false,
        },
        status if status != td.status() => {
            td.update_status(status);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Deployment, RunConclusion};
    use crate::gateway::GatewayResult;
    use crate::store::InMemoryTrackerStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct StubGateway {
        runs: Mutex<HashMap<String, Run>>,
        failing: Mutex<Vec<String>>,
    }

    impl StubGateway {
        fn set(&self, run: Run) {
            self.runs.lock().insert(run.id().to_string(), run);
        }

        fn fail(&self, run_id: &str) {
            self.failing.lock().push(run_id.to_string());
        }
    }

    #[async_trait]
    impl RunGateway for StubGateway {
        async fn get_run(&self, run_id: &str) -> GatewayResult<Option<Run>> {
            if self.failing.lock().iter().any(|id| id == run_id) {
                return Err(GatewayError::CommandFailed {
                    command: "gh run view".to_string(),
                    stderr: "HTTP 502".to_string(),
                });
            }
            Ok(self.runs.lock().get(run_id).cloned())
        }

        async fn get_run_logs(&self, run_id: &str) -> GatewayResult<String> {
            Ok(format!("logs for {run_id}"))
        }

        async fn create_run(&self, _deployment: &Deployment) -> GatewayResult<Run> {
            Err(GatewayError::parse("not supported"))
        }
    }

    fn setup() -> (Arc<InMemoryTrackerStore>, Arc<StubGateway>, StatusOrchestrator) {
        let store = Arc::new(InMemoryTrackerStore::new());
        let gateway = Arc::new(StubGateway::default());
        let orchestrator = StatusOrchestrator::new(store.clone(), gateway.clone());
        (store, gateway, orchestrator)
    }

    fn workflow() -> Workflow {
        Workflow::new("deploy.yml").unwrap()
    }

    #[test]
    fn test_apply_observation_rules() {
        let mut td = TrackedDeployment::new("1", workflow(), "main", "owner/repo");

        let unknown = Run::new("1", 1, RunStatus::Unknown, "main", "");
        assert!(!apply_observation(&mut td, &unknown));
        assert_eq!(td.status(), RunStatus::Queued);

        let running = Run::new("1", 1, RunStatus::InProgress, "main", "");
        assert!(apply_observation(&mut td, &running));
        assert!(!apply_observation(&mut td, &running));

        let done = running.clone().with_conclusion(RunConclusion::Failure);
        assert!(apply_observation(&mut td, &done));
        assert!(td.is_failed());

        // A late in-progress snapshot cannot reopen the record
        assert!(!apply_observation(&mut td, &running));
        assert!(td.is_completed());
    }

    #[tokio::test]
    async fn test_list_tracked_refreshes_and_persists() {
        let (store, gateway, orchestrator) = setup();
        orchestrator
            .track_deployment("10", workflow(), "main", "owner/repo")
            .await
            .unwrap();
        gateway.set(Run::new("10", 3, RunStatus::InProgress, "main", ""));

        let listed = orchestrator.list_tracked().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status(), RunStatus::InProgress);

        let stored = store.get_by_id("10").await.unwrap().unwrap();
        assert_eq!(stored.status(), RunStatus::InProgress);
    }

    #[tokio::test]
    async fn test_gateway_failure_keeps_record() {
        let (_store, gateway, orchestrator) = setup();
        orchestrator
            .track_deployment("11", workflow(), "main", "owner/repo")
            .await
            .unwrap();
        gateway.fail("11");

        let listed = orchestrator.list_tracked().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status(), RunStatus::Queued);
        assert!(listed[0].is_active());
    }

    #[tokio::test]
    async fn test_get_run_logs_passes_through() {
        let (_store, _gateway, orchestrator) = setup();
        assert_eq!(orchestrator.get_run_logs("12").await.unwrap(), "logs for 12");
    }

    #[tokio::test]
    async fn test_get_tracked_absent() {
        let (_store, _gateway, orchestrator) = setup();
        assert!(orchestrator.get_tracked("missing").await.unwrap().is_none());
    }
}
