//! # Error Types
//!
//! Crate-level error handling for tracking, persistence, and gateway operations.

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::store::StoreError;

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors surfaced to callers of the tracker API
///
/// Absence is never represented here: a record that is not tracked, or a run
/// that is not yet visible upstream, comes back as `Ok(None)`.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TrackerError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if the failure came from the remote run source and may clear up on retry
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            TrackerError::Gateway(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackerError::validation("workflow name is required");
        assert_eq!(
            err.to_string(),
            "Validation error: workflow name is required"
        );
    }

    #[test]
    fn test_gateway_timeout_is_transient() {
        let err: TrackerError = GatewayError::Timeout {
            operation: "get_run".to_string(),
            timeout_ms: 100,
        }
        .into();
        assert!(err.is_transient());
        assert!(!TrackerError::configuration("bad").is_transient());
    }
}
