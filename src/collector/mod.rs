//! Fetching and decoding Mesos master/agent metrics
//!
//! Fetches the Mesos REST endpoints and decodes their JSON bodies.
//!
//! # Example
//!
//! ```ignore
//! use mesos_collector::collector::MesosClient;
//!
//! let client = MesosClient::new("127.0.0.1:5051", 5000, 30000)?;
//! let snapshot = client.metrics_snapshot().await?;
//! let executors = client.monitoring_statistics().await?;
//! ```

mod client;
mod parser;

pub use client::MesosClient;
pub use parser::{
    parse_executors, parse_flags, parse_frameworks, parse_snapshot, CollectResult, Entity, Flags,
    MetricSnapshot, StatValue,
};

/// Flat metrics snapshot (master and agent)
pub const SNAPSHOT_PATH: &str = "/metrics/snapshot";
/// Per-executor resource statistics (agent)
pub const STATISTICS_PATH: &str = "/monitor/statistics";
/// Process flags, including the isolator list (agent)
pub const FLAGS_PATH: &str = "/flags";
/// Registered frameworks (master)
pub const FRAMEWORKS_PATH: &str = "/master/frameworks";
/// Leader redirect probe (master)
pub const REDIRECT_PATH: &str = "/master/redirect";
