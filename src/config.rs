//! # Tracker Configuration
//!
//! Configuration for the tracker library and the `deploytrack` CLI.
//! Supports config files, environment variables, and command-line overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::{
    env, APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_COMMAND_TIMEOUT, DEFAULT_GATEWAY_TIMEOUT,
    DEFAULT_HISTORY_LIMIT, DEFAULT_REFRESH_CONCURRENCY, DEFAULT_RETENTION, HISTORY_DIR_NAME,
    LOCAL_CONFIG_FILE_NAME, TRACKED_DIR_NAME,
};
use crate::error::{TrackerError, TrackerResult};
use crate::gateway::RetryPolicy;
use crate::orchestration::ReconcileSettings;
use crate::resilience::CircuitBreakerConfig;

/// Tracker configuration
///
/// # Examples
///
/// ```rust
/// use deploy_tracker::config::TrackerConfig;
///
/// let config = TrackerConfig::default();
/// assert_eq!(config.reconcile.retention_secs, 7 * 24 * 60 * 60);
/// assert_eq!(config.gateway.gh_binary, "gh");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Directory holding one file per tracked deployment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
    pub reconcile: ReconcileConfig,
    pub gateway: GatewayConfig,
    pub circuit_breaker: CircuitBreakerSettings,
    pub dashboard: DashboardConfig,
    pub history: HistoryConfig,
}

/// Refresh and garbage collection policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Age after which tracked deployments are removed
    pub retention_secs: u64,
    /// Deadline for one run source call during a refresh, retries included;
    /// must cover [`GatewayConfig::read_budget`]
    pub gateway_timeout_ms: u64,
    /// Active deployments refreshed at once
    pub refresh_concurrency: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            retention_secs: DEFAULT_RETENTION.as_secs(),
            gateway_timeout_ms: duration_ms(DEFAULT_GATEWAY_TIMEOUT),
            refresh_concurrency: DEFAULT_REFRESH_CONCURRENCY,
        }
    }
}

/// Run source connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Repository in `owner/repo` form; empty uses the current checkout
    pub repo: String,
    pub gh_binary: String,
    pub command_timeout_ms: u64,
    /// Retries for idempotent reads
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Wait between dispatching a workflow and looking up its run
    pub trigger_settle_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            gh_binary: "gh".to_string(),
            command_timeout_ms: duration_ms(DEFAULT_COMMAND_TIMEOUT),
            max_retries: 2,
            retry_base_delay_ms: 200,
            trigger_settle_ms: 2_000,
        }
    }
}

impl GatewayConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    /// Longest a read can take inside the gateway: every attempt running into
    /// the command timeout, plus the backoff between attempts
    pub fn read_budget(&self) -> Duration {
        let policy = self.retry_policy();
        let attempts = self.max_retries.saturating_add(1);
        let commands = Duration::from_millis(self.command_timeout_ms).saturating_mul(attempts);
        (1..=self.max_retries).fold(commands, |total, attempt| {
            total.saturating_add(policy.delay_for(attempt))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub open_timeout_secs: u64,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout_secs: 30,
            success_threshold: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Seconds between refreshes of `deploytrack watch`
    pub refresh_interval_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5,
        }
    }
}

/// Triggered-deployment history kept for `deploytrack replay`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Newest entries kept; older ones are pruned after each trigger
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_entries: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a config file and the environment
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. `explicit` path, which must exist and parse
    /// 3. `./deploytrack.toml`, then `~/.deploytrack/config.toml`
    /// 4. Default values
    pub fn load(explicit: Option<&Path>) -> TrackerResult<Self> {
        let mut config = match explicit {
            Some(path) => {
                debug!("Loading config from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => match Self::find_config_file() {
                Some(path) => {
                    debug!("Loading config from: {}", path.display());
                    match Self::load_from_file(&path) {
                        Ok(file_config) => file_config,
                        Err(e) => {
                            warn!("Ignoring unreadable config file: {}", e);
                            Self::default()
                        }
                    }
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        config.validate()?;

        debug!("Loaded tracker configuration: {:?}", config);
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> TrackerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            TrackerError::configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }

        let home = Self::default_config_path().ok()?;
        home.is_file().then_some(home)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(env::STORE_DIR) {
            self.store_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup(env::HISTORY_DIR) {
            self.history.dir = Some(PathBuf::from(dir));
        }
        if let Some(repo) = lookup(env::REPO) {
            self.gateway.repo = repo;
        }
        if let Some(bin) = lookup(env::GH_BIN) {
            self.gateway.gh_binary = bin;
        }
        if let Some(raw) = lookup(env::RETENTION_SECS) {
            match raw.parse() {
                Ok(secs) => self.reconcile.retention_secs = secs,
                Err(_) => warn!(variable = env::RETENTION_SECS, value = %raw, "Ignoring invalid override"),
            }
        }
        if let Some(raw) = lookup(env::GATEWAY_TIMEOUT_MS) {
            match raw.parse() {
                Ok(ms) => self.reconcile.gateway_timeout_ms = ms,
                Err(_) => warn!(variable = env::GATEWAY_TIMEOUT_MS, value = %raw, "Ignoring invalid override"),
            }
        }
    }

    /// Reject settings the tracker cannot run with
    pub fn validate(&self) -> TrackerResult<()> {
        if self.reconcile.refresh_concurrency == 0 {
            return Err(TrackerError::configuration(
                "reconcile.refresh_concurrency must be at least 1",
            ));
        }
        if self.reconcile.gateway_timeout_ms == 0 {
            return Err(TrackerError::configuration(
                "reconcile.gateway_timeout_ms must be greater than 0",
            ));
        }
        if self.reconcile.retention_secs == 0 {
            return Err(TrackerError::configuration(
                "reconcile.retention_secs must be greater than 0",
            ));
        }
        if self.gateway.command_timeout_ms == 0 {
            return Err(TrackerError::configuration(
                "gateway.command_timeout_ms must be greater than 0",
            ));
        }
        let budget = self.gateway.read_budget();
        if Duration::from_millis(self.reconcile.gateway_timeout_ms) < budget {
            // Otherwise the refresh deadline cancels a hung command before the
            // gateway reports it, and the circuit breaker never sees the hang
            return Err(TrackerError::configuration(format!(
                "reconcile.gateway_timeout_ms ({}) must be at least {} \
                 (gateway.command_timeout_ms x (max_retries + 1) plus retry backoff)",
                self.reconcile.gateway_timeout_ms,
                duration_ms(budget)
            )));
        }
        if self.history.max_entries == 0 {
            return Err(TrackerError::configuration(
                "history.max_entries must be at least 1",
            ));
        }
        if self.gateway.gh_binary.trim().is_empty() {
            return Err(TrackerError::configuration("gateway.gh_binary is required"));
        }
        if !self.gateway.repo.is_empty() && !is_owner_repo(&self.gateway.repo) {
            return Err(TrackerError::configuration(format!(
                "gateway.repo must look like owner/repo, got {:?}",
                self.gateway.repo
            )));
        }
        Ok(())
    }

    /// Directory of the tracked-run store
    pub fn store_dir(&self) -> TrackerResult<PathBuf> {
        if let Some(dir) = &self.store_dir {
            return Ok(dir.clone());
        }
        Ok(Self::app_dir()?.join(TRACKED_DIR_NAME))
    }

    /// Directory of the deployment history
    pub fn history_dir(&self) -> TrackerResult<PathBuf> {
        if let Some(dir) = &self.history.dir {
            return Ok(dir.clone());
        }
        Ok(Self::app_dir()?.join(HISTORY_DIR_NAME))
    }

    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            retention: Duration::from_secs(self.reconcile.retention_secs),
            gateway_timeout: Duration::from_millis(self.reconcile.gateway_timeout_ms),
            refresh_concurrency: self.reconcile.refresh_concurrency,
        }
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker.failure_threshold,
            open_timeout: Duration::from_secs(self.circuit_breaker.open_timeout_secs),
            success_threshold: self.circuit_breaker.success_threshold,
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> TrackerResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TrackerError::configuration(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            TrackerError::configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content).map_err(|e| {
            TrackerError::configuration(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Get default config file path
    pub fn default_config_path() -> TrackerResult<PathBuf> {
        Ok(Self::app_dir()?.join(CONFIG_FILE_NAME))
    }

    fn app_dir() -> TrackerResult<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| TrackerError::configuration("Could not determine home directory"))?;
        Ok(home_dir.join(APP_DIR_NAME))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn is_owner_repo(repo: &str) -> bool {
    match repo.split_once('/') {
        Some((owner, name)) => !owner.is_empty() && !name.is_empty() && !name.contains('/'),
        None => false,
    }
}
