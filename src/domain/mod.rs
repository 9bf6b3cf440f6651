//! # Deployment Domain
//!
//! Value objects and entities for triggering and tracking workflow runs.
//!
//! - [`Run`] is the remote run source's view of an execution; read-only here.
//! - [`TrackedDeployment`] is the locally owned lifecycle mirror that the
//!   reconciliation engine keeps in step with the remote run.
//! - [`Deployment`], [`Workflow`] and [`Input`] describe a run to be triggered.

pub mod deployment;
pub mod input;
pub mod run;
pub mod tracked_deployment;
pub mod workflow;

pub use deployment::Deployment;
pub use input::{Input, InputKind};
pub use run::{Run, RunConclusion, RunStatus};
pub use tracked_deployment::TrackedDeployment;
pub use workflow::Workflow;
