//! Mesos collector plugin
//!
//! Ties the HTTP clients, the catalog builder, the rate tracker and the
//! resolver together behind the two calls the host makes: discovery
//! ([`MesosCollector::metric_types`]) and collection
//! ([`MesosCollector::collect_metrics`]).
//!
//! # Example
//!
//! ```ignore
//! let collector = MesosCollector::new(&config.mesos)?;
//! let catalog = collector.metric_types(Some(Service::Agent)).await?;
//! let metrics = collector.collect_metrics(&catalog).await?;
//! ```

pub mod policy;
pub mod rate;
pub mod resolver;

pub use policy::{config_policy, ConfigPolicy, PolicyRule, ValueKind};
pub use rate::{advertise_derived, derive_utilization, CpuSample, RateTracker, CPU_UTILIZATION_METRIC};
pub use resolver::{resolve, Metric, Sample, SOURCE_TAG};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, info, instrument, warn};

use crate::catalog::{
    build_catalog, catalog_namespaces, Capabilities, CatalogPaths, Namespace, Service, FRAMEWORK,
    RESOURCE_STATISTICS,
};
use crate::collector::{Entity, MesosClient, MetricSnapshot, StatValue};
use crate::config::{DiscoveryMode, MesosConfig};
use crate::error::PluginError;
use crate::metrics::PluginMetrics;

/// Collector instance; owns the clients and the prior CPU samples
pub struct MesosCollector {
    master: Option<MesosClient>,
    agent: Option<MesosClient>,
    discovery: DiscoveryMode,
    rates: RateTracker,
    stats: Arc<PluginMetrics>,
}

impl MesosCollector {
    /// Build a collector from the `mesos` config section
    ///
    /// # Errors
    /// [`PluginError::NoEndpoints`] when neither endpoint is set, or a
    /// collector error if an HTTP client cannot be created.
    pub fn new(config: &MesosConfig) -> Result<Self, PluginError> {
        let client = |host: &Option<String>| -> Result<Option<MesosClient>, PluginError> {
            match host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
                Some(host) => Ok(Some(
                    MesosClient::new(host, config.snapshot_timeout_ms, config.statistics_timeout_ms)?
                        .with_hostname_resolution(config.resolve_hostnames),
                )),
                None => Ok(None),
            }
        };

        let master = client(&config.master)?;
        let agent = client(&config.agent)?;
        if master.is_none() && agent.is_none() {
            return Err(PluginError::NoEndpoints);
        }

        Ok(Self {
            master,
            agent,
            discovery: config.discovery,
            rates: RateTracker::new(),
            stats: Arc::new(PluginMetrics::new()),
        })
    }

    /// Share an existing stats registry
    pub fn with_metrics(mut self, stats: Arc<PluginMetrics>) -> Self {
        self.stats = stats;
        self
    }

    pub fn metrics(&self) -> Arc<PluginMetrics> {
        Arc::clone(&self.stats)
    }

    /// Services with a configured endpoint
    pub fn services(&self) -> Vec<Service> {
        Service::ALL
            .into_iter()
            .filter(|s| self.client(*s).is_ok())
            .collect()
    }

    pub fn client(&self, service: Service) -> Result<&MesosClient, PluginError> {
        match service {
            Service::Master => self.master.as_ref(),
            Service::Agent => self.agent.as_ref(),
        }
        .ok_or(PluginError::ServiceNotConfigured(service))
    }

    pub fn config_policy(&self) -> ConfigPolicy {
        config_policy()
    }

    /// Discovery: every namespace the configured services can report
    ///
    /// With `only` set, just that service is queried. Any fetch failure,
    /// including the agent's `/flags`, fails the whole call.
    pub async fn metric_types(&self, only: Option<Service>) -> Result<Vec<Namespace>, PluginError> {
        let services = match only {
            Some(service) => {
                self.client(service)?;
                vec![service]
            }
            None => self.services(),
        };

        let mut namespaces = Vec::new();
        for service in services {
            let result = self.discover(service).await;
            self.stats.record_discovery(service, result.is_ok());
            let discovered = result?;
            info!(service = %service, count = discovered.len(), "Catalog discovered");
            namespaces.extend(discovered);
        }

        Ok(namespaces)
    }

    #[instrument(skip(self), fields(mode = ?self.discovery))]
    async fn discover(&self, service: Service) -> Result<Vec<Namespace>, PluginError> {
        let client = self.client(service)?;
        let snapshot = client.metrics_snapshot().await?;

        let paths = match service {
            Service::Agent => {
                let flags = client.flags().await?;
                let capabilities = Capabilities::from_flags(&flags);
                debug!(?capabilities, "Agent capabilities");

                let mut paths = match self.discovery {
                    DiscoveryMode::Schema => build_catalog(RESOURCE_STATISTICS, &capabilities),
                    DiscoveryMode::Sample => {
                        let executors = client.monitoring_statistics().await?;
                        sample_catalog(&executors, |stats| build_catalog(stats, &capabilities))
                    }
                };
                advertise_derived(&mut paths);
                paths
            }
            Service::Master => match self.discovery {
                DiscoveryMode::Schema => CatalogPaths::from_source(FRAMEWORK),
                DiscoveryMode::Sample => {
                    let frameworks = client.frameworks().await?;
                    sample_catalog(&frameworks, CatalogPaths::from_source::<StatValue>)
                }
            },
        };

        Ok(catalog_namespaces(service, snapshot.keys(), &paths))
    }

    /// Collection: resolve `requested` against live data
    ///
    /// Every namespace is validated, and every targeted service checked for
    /// an endpoint, before anything is fetched. A master that is not the
    /// leader contributes no records.
    pub async fn collect_metrics(&self, requested: &[Namespace]) -> Result<Vec<Metric>, PluginError> {
        let mut by_service: BTreeMap<Service, Vec<Namespace>> = BTreeMap::new();
        for namespace in requested {
            let service = namespace.validate()?;
            self.client(service)?;
            by_service.entry(service).or_default().push(namespace.clone());
        }

        let mut metrics = Vec::new();
        for (service, namespaces) in by_service {
            let start = Instant::now();
            let result = self.collect_service(service, &namespaces).await;
            let elapsed = start.elapsed().as_secs_f64();

            match result {
                Ok(collected) => {
                    self.stats
                        .record_collection_success(service, collected.len(), elapsed);
                    debug!(
                        service = %service,
                        requested = namespaces.len(),
                        records = collected.len(),
                        "Collection complete"
                    );
                    metrics.extend(collected);
                }
                Err(e) => {
                    self.stats.record_collection_failure(service, elapsed);
                    return Err(e);
                }
            }
        }

        Ok(metrics)
    }

    #[instrument(skip(self, namespaces), fields(count = namespaces.len()))]
    async fn collect_service(
        &self,
        service: Service,
        namespaces: &[Namespace],
    ) -> Result<Vec<Metric>, PluginError> {
        let client = self.client(service)?;

        if service == Service::Master && !is_leader(client).await {
            return Ok(Vec::new());
        }

        let snapshot = if namespaces.iter().any(|n| !n.is_dynamic()) {
            client.metrics_snapshot().await?
        } else {
            MetricSnapshot::new()
        };

        let entities = if namespaces.iter().any(Namespace::is_dynamic) {
            match service {
                Service::Agent => client.monitoring_statistics().await?,
                Service::Master => client.frameworks().await?,
            }
        } else {
            Vec::new()
        };

        let timestamp = SystemTime::now();
        let mut entities = entities;
        if service == Service::Agent && !entities.is_empty() {
            self.rates.apply(timestamp, &mut entities);
        }

        let sample = Sample {
            service,
            source: client.host(),
            timestamp,
            snapshot: &snapshot,
            entities: &entities,
        };
        resolve(namespaces, &sample)
    }
}

/// Union of the catalogs of every live entity
fn sample_catalog<F>(entities: &[Entity], build: F) -> CatalogPaths
where
    F: Fn(&StatValue) -> CatalogPaths,
{
    let mut paths = CatalogPaths::new();
    for entity in entities {
        paths.merge(build(&entity.statistics));
    }
    paths
}

/// Leader policy: a failed probe counts as "not leader"
async fn is_leader(client: &MesosClient) -> bool {
    match client.is_leader().await {
        Ok(true) => true,
        Ok(false) => {
            debug!(host = %client.host(), "Master is not the leader, skipping");
            false
        }
        Err(e) => {
            warn!(host = %client.host(), error = %e, "Leader check failed, skipping master");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(master: Option<&str>, agent: Option<&str>) -> MesosConfig {
        MesosConfig {
            master: master.map(String::from),
            agent: agent.map(String::from),
            ..MesosConfig::default()
        }
    }

    #[test]
    fn test_new_requires_an_endpoint() {
        assert!(matches!(
            MesosCollector::new(&config(None, None)),
            Err(PluginError::NoEndpoints)
        ));
        assert!(matches!(
            MesosCollector::new(&config(Some("  "), None)),
            Err(PluginError::NoEndpoints)
        ));
    }

    #[test]
    fn test_services_follow_config() {
        let collector = MesosCollector::new(&config(None, Some("127.0.0.1:5051"))).unwrap();
        assert_eq!(collector.services(), vec![Service::Agent]);
        assert_eq!(collector.client(Service::Agent).unwrap().host(), "127.0.0.1:5051");
        assert!(matches!(
            collector.client(Service::Master),
            Err(PluginError::ServiceNotConfigured(Service::Master))
        ));

        let collector =
            MesosCollector::new(&config(Some("127.0.0.1:5050"), Some("127.0.0.1:5051"))).unwrap();
        assert_eq!(collector.services(), vec![Service::Master, Service::Agent]);
    }

    #[tokio::test]
    async fn test_collect_rejects_unconfigured_service_before_fetching() {
        // Nothing listens on the agent port; the error must come first.
        let collector = MesosCollector::new(&config(None, Some("127.0.0.1:1"))).unwrap();
        let requested: Vec<Namespace> = vec![
            "agent/system/cpus_total".parse().unwrap(),
            "master/system/cpus_total".parse().unwrap(),
        ];

        let err = collector.collect_metrics(&requested).await.unwrap_err();
        assert!(matches!(err, PluginError::ServiceNotConfigured(Service::Master)));
    }

    #[tokio::test]
    async fn test_discover_unconfigured_service() {
        let collector = MesosCollector::new(&config(Some("127.0.0.1:1"), None)).unwrap();
        let err = collector.metric_types(Some(Service::Agent)).await.unwrap_err();
        assert!(matches!(err, PluginError::ServiceNotConfigured(Service::Agent)));
    }

    #[tokio::test]
    async fn test_collect_nothing_requested() {
        let collector = MesosCollector::new(&config(None, Some("127.0.0.1:1"))).unwrap();
        assert!(collector.collect_metrics(&[]).await.unwrap().is_empty());
    }
}
