//! # Structured Logging Module
//!
//! Console logging for the tracker and its CLI, plus structured helpers for
//! the events worth correlating across a refresh pass.

use chrono::Utc;
use std::io::IsTerminal;
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Map a `-v` count onto a default filter directive
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize console logging on stderr
///
/// `RUST_LOG` takes precedence over `verbosity`. Output stays on stderr so
/// `--json` command output on stdout remains machine readable. Calling this
/// more than once is harmless.
pub fn init_console_logging(verbosity: u8, json: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));
        let use_ansi = std::io::stderr().is_terminal();

        let layer = if json {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi)
                .with_filter(filter)
                .boxed()
        };

        // A subscriber may already be installed by a test harness or embedding host
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }
    });
}

/// Log structured data for tracking operations
pub fn log_tracking_operation(
    operation: &str,
    run_id: Option<&str>,
    workflow: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        run_id = run_id,
        workflow = workflow,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 TRACKING_OPERATION"
    );
}

/// Log structured data for calls to the run source
pub fn log_gateway_call(operation: &str, run_id: Option<&str>, elapsed: Duration, outcome: &str) {
    tracing::debug!(
        operation = %operation,
        run_id = run_id,
        duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        outcome = %outcome,
        "🌐 GATEWAY_CALL"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for_verbosity(0), "warn");
        assert_eq!(level_for_verbosity(1), "info");
        assert_eq!(level_for_verbosity(2), "debug");
        assert_eq!(level_for_verbosity(9), "trace");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_console_logging(1, false);
        init_console_logging(3, true);
        log_tracking_operation("track", Some("run-1"), Some("deploy.yml"), "ok", None);
    }
}
