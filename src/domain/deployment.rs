use chrono::{DateTime, Utc};
use std::fmt;

use super::{Input, Workflow};
use crate::error::{TrackerError, TrackerResult};

/// An intended workflow execution: what to run, where, and with which inputs
///
/// This is the request handed to [`RunGateway::create_run`](crate::gateway::RunGateway::create_run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    workflow: Workflow,
    branch: String,
    repo: String,
    inputs: Vec<Input>,
    created_at: DateTime<Utc>,
}

impl Deployment {
    pub fn new(
        workflow: Workflow,
        branch: impl Into<String>,
        repo: impl Into<String>,
    ) -> TrackerResult<Self> {
        let branch = branch.into();
        if branch.trim().is_empty() {
            return Err(TrackerError::validation("branch is required"));
        }
        Ok(Self {
            workflow,
            branch,
            repo: repo.into(),
            inputs: Vec::new(),
            created_at: Utc::now(),
        })
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Add an input; an input with the same key is replaced
    pub fn add_input(&mut self, input: Input) -> TrackerResult<()> {
        input.validate()?;
        match self.inputs.iter_mut().find(|i| i.key() == input.key()) {
            Some(existing) => *existing = input,
            None => self.inputs.push(input),
        }
        Ok(())
    }

    pub fn input(&self, key: &str) -> Option<&Input> {
        self.inputs.iter().find(|i| i.key() == key)
    }

    pub fn validate_inputs(&self) -> TrackerResult<()> {
        self.inputs.iter().try_for_each(Input::validate)
    }

    /// Key/value pairs in insertion order, as sent to the run source
    pub fn inputs_map(&self) -> Vec<(String, String)> {
        self.inputs
            .iter()
            .map(|i| (i.key().to_string(), i.value().to_string()))
            .collect()
    }

    /// Multi-line description for confirmation prompts
    pub fn summary(&self) -> String {
        let mut summary = format!("Workflow: {}\nBranch: {}\n", self.workflow, self.branch);
        if !self.inputs.is_empty() {
            summary.push_str("Inputs:\n");
            for input in &self.inputs {
                summary.push_str(&format!("  - {input}\n"));
            }
        }
        summary
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.workflow, self.branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InputKind;

    fn deployment() -> Deployment {
        Deployment::new(Workflow::new("deploy.yml").unwrap(), "main", "owner/repo").unwrap()
    }

    #[test]
    fn test_branch_required() {
        let workflow = Workflow::new("deploy.yml").unwrap();
        assert!(Deployment::new(workflow, "", "owner/repo").is_err());
    }

    #[test]
    fn test_duplicate_input_replaces() {
        let mut deployment = deployment();
        deployment.add_input(Input::string("env", "dev").unwrap()).unwrap();
        deployment.add_input(Input::string("tag", "v1").unwrap()).unwrap();
        deployment.add_input(Input::string("env", "prod").unwrap()).unwrap();

        assert_eq!(
            deployment.inputs_map(),
            vec![
                ("env".to_string(), "prod".to_string()),
                ("tag".to_string(), "v1".to_string())
            ]
        );
    }

    #[test]
    fn test_invalid_input_rejected() {
        let mut deployment = deployment();
        let input = Input::new("skip", InputKind::Boolean, "perhaps", false).unwrap();
        assert!(deployment.add_input(input).is_err());
        assert!(deployment.input("skip").is_none());
    }

    #[test]
    fn test_summary_lists_inputs() {
        let mut deployment = deployment();
        deployment.add_input(Input::string("env", "dev").unwrap()).unwrap();
        let summary = deployment.summary();
        assert!(summary.contains("Workflow: deploy.yml"));
        assert!(summary.contains("env=dev (type:string)"));
    }
}
