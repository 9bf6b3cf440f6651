//! # Orchestration
//!
//! Application services tying the tracked-run store to the run source.
//!
//! ## Core Components
//!
//! - **StatusOrchestrator**: lists, refreshes, tracks, dismisses and garbage
//!   collects tracked deployments
//! - **TriggerService**: dispatches a new deployment and tracks the run it creates

pub mod status_orchestrator;
pub mod trigger_service;

pub use status_orchestrator::{apply_observation, ReconcileSettings, StatusOrchestrator};
pub use trigger_service::{TriggerOutcome, TriggerRequest, TriggerService};
