use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TrackerError, TrackerResult};

/// Accepted spellings of a boolean workflow input
const BOOLEAN_LITERALS: &[&str] = &["true", "false", "yes", "no", "1", "0"];

/// Declared type of a workflow input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options", rename_all = "snake_case")]
pub enum InputKind {
    String,
    Boolean,
    Choice(Vec<String>),
    Unknown,
}

impl InputKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Choice(_) => "choice",
            Self::Unknown => "unknown",
        }
    }
}

/// A typed value passed to a workflow when it is triggered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    key: String,
    kind: InputKind,
    value: String,
    required: bool,
}

impl Input {
    pub fn new(
        key: impl Into<String>,
        kind: InputKind,
        value: impl Into<String>,
        required: bool,
    ) -> TrackerResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(TrackerError::validation("input key is required"));
        }
        let input = Self {
            key,
            kind,
            value: value.into(),
            required,
        };
        // A choice must be valid as soon as it carries a value
        if matches!(input.kind, InputKind::Choice(_)) && !input.value.is_empty() {
            input.validate()?;
        }
        Ok(input)
    }

    /// Untyped input, as supplied on the command line
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> TrackerResult<Self> {
        Self::new(key, InputKind::String, value, false)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &InputKind {
        &self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Replace the value, validating it against the declared type
    pub fn set_value(&mut self, value: impl Into<String>) -> TrackerResult<()> {
        self.value = value.into();
        self.validate()
    }

    /// Check that the current value is acceptable for the declared type
    pub fn validate(&self) -> TrackerResult<()> {
        if self.required && self.value.is_empty() {
            return Err(TrackerError::validation(format!(
                "missing required input: {}",
                self.key
            )));
        }
        if self.value.is_empty() {
            return Ok(());
        }

        match &self.kind {
            InputKind::Boolean if !BOOLEAN_LITERALS.contains(&self.value.as_str()) => {
                Err(TrackerError::validation(format!(
                    "input {} expects a boolean, got {:?}",
                    self.key, self.value
                )))
            }
            InputKind::Choice(options) if !options.iter().any(|o| o == &self.value) => {
                Err(TrackerError::validation(format!(
                    "input {} must be one of [{}], got {:?}",
                    self.key,
                    options.join(", "),
                    self.value
                )))
            }
            _ => Ok(()),
        }
    }

    /// Parse a `key=value` pair
    pub fn parse_assignment(raw: &str) -> TrackerResult<Self> {
        let (key, value) = raw.split_once('=').ok_or_else(|| {
            TrackerError::validation(format!("expected key=value, got {raw:?}"))
        })?;
        Self::string(key.trim(), value)
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} (type:{})", self.key, self.value, self.kind.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_input_needs_value() {
        let input = Input::new("environment", InputKind::String, "", true).unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_boolean_literals() {
        let mut input = Input::new("skip_tests", InputKind::Boolean, "yes", false).unwrap();
        assert!(input.validate().is_ok());
        assert!(input.set_value("maybe").is_err());
        assert!(input.set_value("0").is_ok());
    }

    #[test]
    fn test_choice_membership() {
        let options = vec!["dev".to_string(), "staging".to_string(), "prod".to_string()];
        assert!(Input::new("env", InputKind::Choice(options.clone()), "qa", true).is_err());

        let mut input = Input::new("env", InputKind::Choice(options), "", true).unwrap();
        assert!(input.validate().is_err());
        assert!(input.set_value("prod").is_ok());
    }

    #[test]
    fn test_parse_assignment() {
        let input = Input::parse_assignment("version=1.2.3=rc").unwrap();
        assert_eq!(input.key(), "version");
        assert_eq!(input.value(), "1.2.3=rc");
        assert!(Input::parse_assignment("novalue").is_err());
        assert!(Input::parse_assignment("=x").is_err());
    }
}
