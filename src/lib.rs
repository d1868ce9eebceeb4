//! mesos-collector library
//!
//! Discovers and collects metrics from Apache Mesos masters and agents:
//! flat `/metrics/snapshot` gauges plus per-executor and per-framework
//! statistics, addressed by hierarchical namespaces with wildcards.

pub mod catalog;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod plugin;
pub mod server;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging subsystem
///
/// `RUST_LOG` takes precedence over `level`. Output goes to stderr so that
/// `--validate` and `--discover` keep stdout machine-readable.
///
/// # Errors
/// Returns an error if a global subscriber is already installed
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
