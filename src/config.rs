//! Configuration management for mesos-collector
//!
//! Handles loading and validating configuration from YAML files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Mesos endpoint configuration
    #[serde(default)]
    pub mesos: MesosConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// How the per-entity part of the catalog is discovered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Enumerate the static field table of each record type
    #[default]
    Schema,
    /// Enumerate whatever the current live sample contains
    Sample,
}

/// Mesos endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MesosConfig {
    /// Master endpoint (`host:port`)
    pub master: Option<String>,

    /// Agent endpoint (`host:port`)
    pub agent: Option<String>,

    /// Resolve hostnames when comparing the leader redirect target with the
    /// configured master
    #[serde(default = "default_resolve_hostnames")]
    pub resolve_hostnames: bool,

    /// Timeout for snapshot, flags, frameworks and redirect requests
    #[serde(default = "default_snapshot_timeout")]
    pub snapshot_timeout_ms: u64,

    /// Timeout for the executor statistics request
    #[serde(default = "default_statistics_timeout")]
    pub statistics_timeout_ms: u64,

    /// Catalog discovery mode
    #[serde(default)]
    pub discovery: DiscoveryMode,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

// Default value functions
fn default_resolve_hostnames() -> bool {
    true
}

fn default_snapshot_timeout() -> u64 {
    5000
}

fn default_statistics_timeout() -> u64 {
    30000
}

fn default_port() -> u16 {
    9595
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

impl Default for MesosConfig {
    fn default() -> Self {
        Self {
            master: None,
            agent: None,
            resolve_hostnames: default_resolve_hostnames(),
            snapshot_timeout_ms: default_snapshot_timeout(),
            statistics_timeout_ms: default_statistics_timeout(),
            discovery: DiscoveryMode::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed. Validation is
    /// left to the caller so CLI overrides can be applied first.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mesos.validate()?;

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl MesosConfig {
    /// Validate the endpoint section on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        let master = self.master.as_deref().map(str::trim).unwrap_or_default();
        let agent = self.agent.as_deref().map(str::trim).unwrap_or_default();

        if master.is_empty() && agent.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one of 'mesos.master' or 'mesos.agent' must be set".to_string(),
            ));
        }

        if self.snapshot_timeout_ms == 0 || self.statistics_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
