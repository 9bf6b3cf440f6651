//! # Bootstrap
//!
//! Builds the tracker's services from a [`TrackerConfig`]. Everything is
//! passed explicitly; nothing here is global.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::TrackerConfig;
use crate::error::TrackerResult;
use crate::gateway::{GhCliGateway, GhCliSettings, ResilientGateway, RunGateway, WorkflowCatalog};
use crate::history::{DeploymentHistory, FileDeploymentHistory};
use crate::orchestration::{StatusOrchestrator, TriggerService};
use crate::store::{FileTrackerStore, TrackerStore};

/// Fully wired tracker services
#[derive(Debug, Clone)]
pub struct TrackerContext {
    pub config: TrackerConfig,
    pub orchestrator: Arc<StatusOrchestrator>,
    pub trigger: TriggerService,
}

impl TrackerContext {
    /// File store and history plus the `gh`-backed run source, behind retries
    /// and a circuit breaker
    ///
    /// The same resilient gateway serves as the workflow catalog, so
    /// workflow definition reads share the run source's breaker.
    pub fn from_config(config: TrackerConfig) -> TrackerResult<Self> {
        config.validate()?;
        let store_dir = config.store_dir()?;
        let history_dir = config.history_dir()?;
        let store: Arc<dyn TrackerStore> = Arc::new(FileTrackerStore::new(&store_dir));
        let history: Arc<dyn DeploymentHistory> = Arc::new(FileDeploymentHistory::new(&history_dir));

        let gh = Arc::new(ResilientGateway::new(
            GhCliGateway::new(gh_settings(&config)),
            config.circuit_breaker_config(),
            config.gateway.retry_policy(),
        ));
        let gateway: Arc<dyn RunGateway> = gh.clone();
        let catalog: Arc<dyn WorkflowCatalog> = gh;

        info!(
            store_dir = %store_dir.display(),
            history_dir = %history_dir.display(),
            repo = %config.gateway.repo,
            "Tracker services initialized"
        );

        Ok(Self::with_components(config, store, gateway)
            .with_catalog(catalog)
            .with_history(history))
    }

    /// Wire caller-supplied components, e.g. an in-memory store in tests
    pub fn with_components(
        config: TrackerConfig,
        store: Arc<dyn TrackerStore>,
        gateway: Arc<dyn RunGateway>,
    ) -> Self {
        let orchestrator = Arc::new(StatusOrchestrator::with_settings(
            store,
            gateway,
            config.reconcile_settings(),
        ));
        let trigger = TriggerService::new(orchestrator.clone(), config.gateway.repo.clone());
        Self {
            config,
            orchestrator,
            trigger,
        }
    }

    /// Check trigger inputs against declared workflow inputs
    pub fn with_catalog(mut self, catalog: Arc<dyn WorkflowCatalog>) -> Self {
        self.trigger = self.trigger.with_catalog(catalog);
        self
    }

    /// Record triggered deployments, keeping `history.max_entries` of them
    pub fn with_history(mut self, history: Arc<dyn DeploymentHistory>) -> Self {
        self.trigger = self
            .trigger
            .with_history(history, self.config.history.max_entries);
        self
    }
}

fn gh_settings(config: &TrackerConfig) -> GhCliSettings {
    GhCliSettings {
        repo: config.gateway.repo.clone(),
        gh_binary: config.gateway.gh_binary.clone(),
        command_timeout: Duration::from_millis(config.gateway.command_timeout_ms),
        trigger_settle_delay: Duration::from_millis(config.gateway.trigger_settle_ms),
    }
}
