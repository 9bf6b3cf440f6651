#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Deploy Tracker
//!
//! Local tracking and status reconciliation for remotely executed CI/CD
//! workflow runs.
//!
//! ## Overview
//!
//! A deployment is triggered on a remote run source (GitHub Actions) that the
//! local tool does not control. The tracker records that the run was started,
//! reconciles the locally held status with the remote one on every listing,
//! and garbage collects entries once they fall outside the retention window.
//! A listing always renders whatever was last known, even with no network.
//!
//! ## Module Organization
//!
//! - [`domain`] - Runs, tracked deployments, workflows and their inputs
//! - [`store`] - Durable per-record storage of tracked deployments
//! - [`gateway`] - Run source contract and the `gh` CLI implementation
//! - [`history`] - Triggered deployments kept for replay
//! - [`resilience`] - Circuit breaker guarding the run source
//! - [`orchestration`] - Status reconciliation and deployment triggering
//! - [`config`] - Configuration management
//! - [`bootstrap`] - Wiring configuration into services
//! - [`logging`] - Console logging and structured operation events
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deploy_tracker::bootstrap::TrackerContext;
//! use deploy_tracker::config::TrackerConfig;
//!
//! # async fn example() -> deploy_tracker::TrackerResult<()> {
//! let context = TrackerContext::from_config(TrackerConfig::load(None)?)?;
//!
//! for td in context.orchestrator.list_tracked().await? {
//!     println!("{td}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod history;
pub mod logging;
pub mod orchestration;
pub mod resilience;
pub mod store;

pub use bootstrap::TrackerContext;
pub use config::TrackerConfig;
pub use domain::{Run, RunConclusion, RunStatus, TrackedDeployment, Workflow};
pub use error::{TrackerError, TrackerResult};
pub use gateway::{GatewayError, RunGateway, WorkflowCatalog};
pub use history::{DeploymentHistory, FileDeploymentHistory, HistoryEntry};
pub use orchestration::{StatusOrchestrator, TriggerRequest, TriggerService};
pub use store::{FileTrackerStore, InMemoryTrackerStore, StoreError, TrackerStore};
