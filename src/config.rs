//! Hierarchical configuration: a `config.toml` at the current directory,
//! an optional `config.local.toml` override, then environment variables
//! prefixed `CATALOG_CORE_` with `__` as the nesting separator, all
//! merged through `figment`.

use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

fn default_bulk_timeout_secs() -> u64 {
    5
}

fn default_per_asset_timeout_secs() -> u64 {
    2
}

fn default_traverse_node_cap() -> usize {
    500
}

fn default_true() -> bool {
    true
}

/// Deadlines and resource caps for rule evaluation and traversal, per §5.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionConfig {
    #[serde(default = "default_bulk_timeout_secs")]
    pub bulk_timeout_secs: u64,
    #[serde(default = "default_per_asset_timeout_secs")]
    pub per_asset_timeout_secs: u64,
    #[serde(default = "default_traverse_node_cap")]
    pub traverse_node_cap: usize,
}

impl ExecutionConfig {
    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_timeout_secs)
    }

    pub fn per_asset_timeout(&self) -> Duration {
        Duration::from_secs(self.per_asset_timeout_secs)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            bulk_timeout_secs: default_bulk_timeout_secs(),
            per_asset_timeout_secs: default_per_asset_timeout_secs(),
            traverse_node_cap: default_traverse_node_cap(),
        }
    }
}

/// Logging sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_log_level(), json: default_true() }
    }
}

/// Top-level configuration for the ingest/query CLIs and for embedding
/// callers that want config-driven deadlines rather than hardcoded ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Merge `config.toml`, `config.local.toml`, and `CATALOG_CORE_`
    /// environment overrides, in that order of increasing precedence.
    pub fn load() -> Result<Config, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("CATALOG_CORE_").split("__"))
            .extract()
    }

    pub fn from_file(path: &str) -> Result<Config, figment::Error> {
        Figment::new().merge(Toml::file(path)).extract()
    }
}
