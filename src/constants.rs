//! # Constants
//!
//! Fixed values shared across the tracker: retention windows, file names,
//! and the environment variables recognised by the configuration loader.

use std::time::Duration;

/// Completed (or abandoned) deployments older than this are garbage collected
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Deadline applied to a single gateway call during reconciliation
///
/// Covers every retry of a `gh` command, so a hung command times out inside
/// the gateway and is counted by its circuit breaker.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for one `gh` process
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(8);

/// Number of active records refreshed concurrently during one pass
pub const DEFAULT_REFRESH_CONCURRENCY: usize = 4;

/// Application directory under the user's home directory
pub const APP_DIR_NAME: &str = ".deploytrack";

/// Subdirectory of the application directory holding one file per tracked run
pub const TRACKED_DIR_NAME: &str = "tracked";

/// Subdirectory of the application directory holding triggered-deployment history
pub const HISTORY_DIR_NAME: &str = "history";

/// Number of triggered deployments kept in the history
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Configuration file inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file looked up in the current working directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "deploytrack.toml";

/// Extension of a persisted tracked-deployment record
pub const RECORD_EXTENSION: &str = "json";

/// Environment variable overrides
pub mod env {
    pub const STORE_DIR: &str = "DEPLOYTRACK_STORE_DIR";
    pub const HISTORY_DIR: &str = "DEPLOYTRACK_HISTORY_DIR";
    pub const REPO: &str = "DEPLOYTRACK_REPO";
    pub const GH_BIN: &str = "DEPLOYTRACK_GH_BIN";
    pub const RETENTION_SECS: &str = "DEPLOYTRACK_RETENTION_SECS";
    pub const GATEWAY_TIMEOUT_MS: &str = "DEPLOYTRACK_GATEWAY_TIMEOUT_MS";
}

/// Operation names used in structured log events
pub mod operations {
    pub const TRACK: &str = "track";
    pub const REFRESH: &str = "refresh";
    pub const DISMISS: &str = "dismiss";
    pub const CLEANUP: &str = "cleanup";
    pub const TRIGGER: &str = "trigger";
    pub const REPLAY: &str = "replay";
}
