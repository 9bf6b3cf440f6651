//! Reading the `workflow_dispatch` inputs declared by a workflow definition.

use serde_yaml::{Mapping, Value};

use super::{GatewayError, GatewayResult};
use crate::domain::{Input, InputKind};

/// Declared dispatch inputs of a workflow, in declaration order
///
/// A workflow without a `workflow_dispatch` trigger, or one that declares no
/// inputs, yields an empty list. Each input starts out holding its declared
/// default.
pub fn parse_dispatch_inputs(yaml: &str) -> GatewayResult<Vec<Input>> {
    let document: Value = serde_yaml::from_str(yaml)
        .map_err(|e| GatewayError::parse(format!("workflow definition: {e}")))?;

    match dispatch_inputs(&document) {
        Some(inputs) => inputs
            .iter()
            .map(|(name, spec)| parse_input(name, spec))
            .collect(),
        None => Ok(Vec::new()),
    }
}

// `on: push` and `on: [push, workflow_dispatch]` declare no inputs
fn dispatch_inputs(document: &Value) -> Option<&Mapping> {
    document
        .get("on")?
        .get("workflow_dispatch")?
        .get("inputs")?
        .as_mapping()
}

fn parse_input(name: &Value, spec: &Value) -> GatewayResult<Input> {
    let key = name
        .as_str()
        .ok_or_else(|| GatewayError::parse("workflow input with a non-string name"))?;

    let required = spec.get("required").is_some_and(is_true);
    let default = spec.get("default").map(scalar_text).unwrap_or_default();
    let kind = match spec.get("type").and_then(Value::as_str).unwrap_or("string") {
        "boolean" => InputKind::Boolean,
        "choice" => InputKind::Choice(
            spec.get("options")
                .and_then(Value::as_sequence)
                .map(|options| options.iter().map(scalar_text).collect())
                .unwrap_or_default(),
        ),
        "string" | "number" | "environment" => InputKind::String,
        _ => InputKind::Unknown,
    };

    Input::new(key, kind, default, required)
        .map_err(|e| GatewayError::parse(format!("workflow input {key}: {e}")))
}

fn is_true(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}
