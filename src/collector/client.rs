//! HTTP client for the Mesos master and agent APIs
//!
//! Plain HTTP GET against fixed Mesos REST paths, with a per-endpoint timeout.

use reqwest::{redirect, Client, ClientBuilder, StatusCode};
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::parser::{
    parse_executors, parse_flags, parse_frameworks, parse_snapshot, CollectResult, Entity,
    Flags, MetricSnapshot,
};
use super::{FLAGS_PATH, FRAMEWORKS_PATH, REDIRECT_PATH, SNAPSHOT_PATH, STATISTICS_PATH};
use crate::error::CollectorError;

/// HTTP client bound to a single Mesos master or agent
#[derive(Clone)]
pub struct MesosClient {
    client: Client,
    /// `host:port` as configured, used for tagging and leader comparison
    host: String,
    base_url: String,
    snapshot_timeout: Duration,
    statistics_timeout: Duration,
    resolve_hostnames: bool,
}

impl MesosClient {
    /// Create a client for `host`
    ///
    /// # Arguments
    /// * `host` - `host:port`, optionally prefixed with `http://`
    /// * `snapshot_timeout_ms` - timeout for snapshot, flags, frameworks and redirect
    /// * `statistics_timeout_ms` - timeout for `/monitor/statistics`
    ///
    /// # Example
    /// ```ignore
    /// let client = MesosClient::new("127.0.0.1:5051", 5000, 30000)?;
    /// ```
    pub fn new(
        host: &str,
        snapshot_timeout_ms: u64,
        statistics_timeout_ms: u64,
    ) -> CollectResult<Self> {
        // The leader probe must see the 307 itself.
        let client = ClientBuilder::new()
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(CollectorError::HttpClientInit)?;

        let trimmed = host.trim().trim_end_matches('/');
        let (host, base_url) = match trimmed.split_once("://") {
            Some((_, rest)) => (rest.to_string(), trimmed.to_string()),
            None => (trimmed.to_string(), format!("http://{}", trimmed)),
        };

        Ok(Self {
            client,
            host,
            base_url,
            snapshot_timeout: Duration::from_millis(snapshot_timeout_ms),
            statistics_timeout: Duration::from_millis(statistics_timeout_ms),
            resolve_hostnames: true,
        })
    }

    /// Enable or disable DNS resolution in the leader comparison
    pub fn with_hostname_resolution(mut self, resolve: bool) -> Self {
        self.resolve_hostnames = resolve;
        self
    }

    /// Polled host, as used in the `source` tag
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Full URL for an endpoint path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path`, require 200 and return the raw body
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn fetch_json(&self, path: &str, timeout: Duration) -> CollectResult<Vec<u8>> {
        let url = self.url(path);
        debug!(url = %url, "Fetching Mesos endpoint");

        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(CollectorError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| classify(e, timeout))?;
        Ok(body.to_vec())
    }

    /// `/metrics/snapshot`
    pub async fn metrics_snapshot(&self) -> CollectResult<MetricSnapshot> {
        let body = self.fetch_json(SNAPSHOT_PATH, self.snapshot_timeout).await?;
        parse_snapshot(&body)
    }

    /// `/monitor/statistics` (agent only)
    pub async fn monitoring_statistics(&self) -> CollectResult<Vec<Entity>> {
        let body = self
            .fetch_json(STATISTICS_PATH, self.statistics_timeout)
            .await?;
        parse_executors(&body)
    }

    /// `/master/frameworks` (master only)
    pub async fn frameworks(&self) -> CollectResult<Vec<Entity>> {
        let body = self
            .fetch_json(FRAMEWORKS_PATH, self.snapshot_timeout)
            .await?;
        parse_frameworks(&body)
    }

    /// `/flags`
    pub async fn flags(&self) -> CollectResult<Flags> {
        let body = self.fetch_json(FLAGS_PATH, self.snapshot_timeout).await?;
        parse_flags(&body)
    }

    /// Whether this master is the current leader
    ///
    /// `/master/redirect` answers 307 with the leader in `Location`; the
    /// master leads when that location points back at the polled host.
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn is_leader(&self) -> CollectResult<bool> {
        let timeout = self.snapshot_timeout;
        let response = self
            .client
            .get(self.url(REDIRECT_PATH))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if status != StatusCode::TEMPORARY_REDIRECT {
            return Err(CollectorError::UnexpectedStatus(status.as_u16()));
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .ok_or(CollectorError::MissingLocation)?
            .to_str()
            .map_err(|_| CollectorError::InvalidLocation("<non-ascii>".to_string()))?
            .to_string();

        let base = Url::parse(&self.base_url)
            .map_err(|_| CollectorError::InvalidLocation(self.base_url.clone()))?;
        let leader = base
            .join(&location)
            .map_err(|_| CollectorError::InvalidLocation(location.clone()))?;

        let (Some(leader_host), Some(own_host)) = (leader.host_str(), base.host_str()) else {
            return Err(CollectorError::InvalidLocation(location));
        };
        let leader_port = leader.port_or_known_default();
        let own_port = base.port_or_known_default();

        debug!(leader = %leader_host, port = ?leader_port, "Leader redirect target");

        if leader_port != own_port {
            return Ok(false);
        }
        if leader_host.eq_ignore_ascii_case(own_host) {
            return Ok(true);
        }
        if !self.resolve_hostnames {
            return Ok(false);
        }

        let port = own_port.unwrap_or(80);
        let own = resolve(own_host, port).await;
        let leader = resolve(leader_host, port).await;
        Ok(!own.is_disjoint(&leader))
    }
}

/// Map a reqwest failure, keeping the configured timeout when it fired
fn classify(err: reqwest::Error, timeout: Duration) -> CollectorError {
    if err.is_timeout() {
        CollectorError::timeout_with_duration(timeout.as_millis() as u64)
    } else {
        CollectorError::from(err)
    }
}

/// Resolve a host to its addresses; resolution failures yield an empty set
async fn resolve(host: &str, port: u16) -> HashSet<IpAddr> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    match tokio::net::lookup_host((host, port)).await {
        Ok(addrs) => addrs.map(|a| a.ip()).collect(),
        Err(e) => {
            debug!(host = %host, error = %e, "Hostname resolution failed");
            HashSet::new()
        }
    }
}
