use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TrackerError, TrackerResult};

/// A workflow in the remote run source, identified by its name or file
/// (e.g. `deploy.yml`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Workflow {
    name: String,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> TrackerResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TrackerError::validation("workflow name is required"));
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl TryFrom<String> for Workflow {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Workflow> for String {
    fn from(workflow: Workflow) -> Self {
        workflow.name
    }
}
