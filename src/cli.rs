//! CLI argument parsing for mesos-collector
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yaml, env: MESOS_COLLECTOR_CONFIG)
//! - `--port` / `-p`: Server port (env: MESOS_COLLECTOR_PORT)
//! - `--bind-address`: Server bind address (env: MESOS_COLLECTOR_BIND_ADDRESS)
//! - `--master`: Mesos master `host:port` (env: MESOS_COLLECTOR_MASTER)
//! - `--agent`: Mesos agent `host:port` (env: MESOS_COLLECTOR_AGENT)
//! - `--snapshot-timeout`: Snapshot/flags/redirect timeout in ms (env: MESOS_COLLECTOR_SNAPSHOT_TIMEOUT)
//! - `--statistics-timeout`: Executor statistics timeout in ms (env: MESOS_COLLECTOR_STATISTICS_TIMEOUT)
//! - `--resolve-hostnames <true|false>`: Compare the leader by resolved address (env: MESOS_COLLECTOR_RESOLVE_HOSTNAMES)
//! - `--discovery`: Catalog source, `schema` or `sample` (env: MESOS_COLLECTOR_DISCOVERY)
//! - `--validate`: Validate configuration without starting the server
//! - `--discover <agent|master>`: Print the metric catalog of one service and exit
//! - `--log-level` / `-l`: Log level (env: MESOS_COLLECTOR_LOG_LEVEL)
//! - `--output-format`: Output format for validate/discover (text/json/yaml)
//!
//! # Precedence
//!
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;

use crate::catalog::Service;
use crate::config::{Config, DiscoveryMode};

/// Mesos master/agent metrics collector
///
/// Discovers the metrics a Mesos cluster can report and collects them on
/// request over HTTP.
#[derive(Parser, Debug)]
#[command(name = "mesos-collector")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "MESOS_COLLECTOR_CONFIG"
    )]
    pub config: PathBuf,

    /// Server port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "MESOS_COLLECTOR_PORT")]
    pub port: Option<u16>,

    /// Server bind address (overrides config file)
    #[arg(long, value_name = "ADDRESS", env = "MESOS_COLLECTOR_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Mesos master endpoint, host:port (overrides config file)
    #[arg(long, value_name = "HOST:PORT", env = "MESOS_COLLECTOR_MASTER")]
    pub master: Option<String>,

    /// Mesos agent endpoint, host:port (overrides config file)
    #[arg(long, value_name = "HOST:PORT", env = "MESOS_COLLECTOR_AGENT")]
    pub agent: Option<String>,

    /// Timeout for snapshot, flags, frameworks and redirect requests in ms
    #[arg(long, value_name = "MS", env = "MESOS_COLLECTOR_SNAPSHOT_TIMEOUT")]
    pub snapshot_timeout: Option<u64>,

    /// Timeout for executor statistics requests in ms
    #[arg(long, value_name = "MS", env = "MESOS_COLLECTOR_STATISTICS_TIMEOUT")]
    pub statistics_timeout: Option<u64>,

    /// Compare the redirect target with the polled master by resolved IP
    #[arg(long, value_name = "BOOL", env = "MESOS_COLLECTOR_RESOLVE_HOSTNAMES")]
    pub resolve_hostnames: Option<bool>,

    /// Catalog discovery mode (overrides config file)
    #[arg(long, value_enum, env = "MESOS_COLLECTOR_DISCOVERY")]
    pub discovery: Option<DiscoveryMode>,

    /// Validate configuration without starting server
    #[arg(long)]
    pub validate: bool,

    /// Print the metric catalog of a service and exit
    #[arg(long, value_name = "SERVICE")]
    pub discover: Option<Service>,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "MESOS_COLLECTOR_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Output format for --validate and --discover
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

impl Cli {
    /// Layer CLI and environment values over a loaded config
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref address) = self.bind_address {
            config.server.bind_address = address.clone();
        }
        if let Some(ref master) = self.master {
            config.mesos.master = Some(master.clone());
        }
        if let Some(ref agent) = self.agent {
            config.mesos.agent = Some(agent.clone());
        }
        if let Some(ms) = self.snapshot_timeout {
            config.mesos.snapshot_timeout_ms = ms;
        }
        if let Some(ms) = self.statistics_timeout {
            config.mesos.statistics_timeout_ms = ms;
        }
        if let Some(resolve) = self.resolve_hostnames {
            config.mesos.resolve_hostnames = resolve;
        }
        if let Some(mode) = self.discovery {
            config.mesos.discovery = mode;
        }
    }
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(level)
    }
}

/// Output format for validate and discover modes
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    Json,
    Yaml,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        };
        f.write_str(format)
    }
}
