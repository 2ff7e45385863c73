//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use terra_ledger::AnchorConfig;
use terra_types::{Role, WalletAddress};
use terra_workflow::WorkflowConfig;

use crate::{LogFormat, NodeError};

/// Configuration for a Terra node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter, e.g. "info" or "debug,terra_workflow=trace".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bound on each evidence store and account directory call.
    #[serde(default = "default_collaborator_timeout_ms")]
    pub collaborator_timeout_ms: u64,

    /// Whether to keep Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Accounts and their roles, seeding the account directory.
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,
}

/// The `[ledger]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the ledger service.
    #[serde(default = "default_ledger_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// One `[[accounts]]` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub address: WalletAddress,
    pub role: Role,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./terra_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_collaborator_timeout_ms() -> u64 {
    5_000
}

fn default_ledger_endpoint() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_queue_capacity() -> usize {
    1024
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject values the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.log_format()?;
        if self.map_size_mb == 0 {
            return Err(NodeError::Config("map_size_mb must be positive".into()));
        }
        if self.collaborator_timeout_ms == 0 {
            return Err(NodeError::Config(
                "collaborator_timeout_ms must be positive".into(),
            ));
        }
        if self.ledger.enabled {
            if !self.ledger.endpoint.starts_with("http://")
                && !self.ledger.endpoint.starts_with("https://")
            {
                return Err(NodeError::Config(format!(
                    "ledger endpoint '{}' is not an http(s) URL",
                    self.ledger.endpoint
                )));
            }
            if self.ledger.max_attempts == 0 {
                return Err(NodeError::Config("ledger.max_attempts must be at least 1".into()));
            }
        }
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            collaborator_timeout: Duration::from_millis(self.collaborator_timeout_ms),
        }
    }
}

impl LedgerConfig {
    pub fn anchor_config(&self) -> AnchorConfig {
        AnchorConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            queue_capacity: self.queue_capacity,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            collaborator_timeout_ms: default_collaborator_timeout_ms(),
            enable_metrics: false,
            ledger: LedgerConfig::default(),
            accounts: Vec::new(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_ledger_endpoint(),
            request_timeout_ms: default_request_timeout_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}
