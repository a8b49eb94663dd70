//! Application configuration.
//!
//! Aggregates node, transport, and RPC settings into a single `Config`
//! loadable from YAML files or environment variables.

use std::time::Duration;

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "CUMULUS_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "CUMULUS";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "CUMULUS_LOG";

/// Errors while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// This node's identity settings.
    pub node: NodeConfig,
    /// Manager endpoint settings.
    pub transport: TransportConfig,
    /// RPC policy settings.
    pub rpc: RpcConfig,
}

/// Node identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node name, e.g. "Manager" or "Wrapper-1". The reserved name
    /// "Manager" marks the authoritative node.
    pub name: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "Wrapper-1".to_string(),
        }
    }
}

/// Manager endpoint configuration: where the manager listens and where
/// wrappers connect.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Host the manager binds / wrappers dial.
    pub host: String,
    /// Port of the manager's frame listener.
    pub port: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1630,
        }
    }
}

impl TransportConfig {
    /// Get the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// RPC policy configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Bound on how long a query may stay outstanding before its
    /// promise rejects with a timeout.
    pub query_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: 20,
        }
    }
}

impl RpcConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Sources, later overriding earlier:
    /// 1. `config.yaml` in the current directory (if present)
    /// 2. File named by the `path` argument (if provided)
    /// 3. File named by `CUMULUS_CONFIG` (if set)
    /// 4. `CUMULUS`-prefixed environment variables
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self::default()
    }
}
