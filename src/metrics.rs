//! Self-observability for the collector
//!
//! Tracks how the plugin itself is doing, per Mesos service, and renders it
//! as JSON for `GET /stats`.
//!
//! # Recorded per service
//!
//! - collections succeeded / failed
//! - catalog discoveries succeeded / failed
//! - records emitted
//! - collection duration histogram (seconds)
//! - timestamp of the last successful collection

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::catalog::Service;

/// Bucket bounds for collection durations, in seconds
pub const DEFAULT_HISTOGRAM_BUCKETS: &[f64] = &[
    0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Monotonic atomic counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// f64 gauge stored as raw bits
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, v: f64) {
        self.value.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }

    /// Set to the current Unix time in seconds
    pub fn set_to_current_time(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.set(now);
    }
}

/// Cumulative histogram with fixed bucket bounds
#[derive(Debug)]
pub struct Histogram {
    /// Sorted upper bounds, always ending in +Inf
    bounds: Vec<f64>,
    counts: Vec<AtomicU64>,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(bounds: &[f64]) -> Self {
        let mut bounds = bounds.to_vec();
        bounds.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if bounds.last().map_or(true, |b| b.is_finite()) {
            bounds.push(f64::INFINITY);
        }

        let counts = bounds.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            bounds,
            counts,
            sum: AtomicU64::new(0.0_f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, v: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);

        // No atomic f64 add; CAS on the bit pattern.
        let mut current = self.sum.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + v).to_bits();
            match self
                .sum
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        for (bound, count) in self.bounds.iter().zip(&self.counts) {
            if v <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Upper bound and cumulative count per bucket
    pub fn buckets(&self) -> Vec<(f64, u64)> {
        self.bounds
            .iter()
            .zip(&self.counts)
            .map(|(bound, count)| (*bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new(DEFAULT_HISTOGRAM_BUCKETS)
    }
}

/// Counters for one Mesos service
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    pub collections_success: Counter,
    pub collections_failure: Counter,
    pub discoveries_success: Counter,
    pub discoveries_failure: Counter,
    pub records_emitted: Counter,
    pub collection_duration_seconds: Histogram,
    pub last_collection_timestamp: Gauge,
}

impl ServiceMetrics {
    fn snapshot(&self) -> ServiceStats {
        ServiceStats {
            collections_success: self.collections_success.get(),
            collections_failure: self.collections_failure.get(),
            discoveries_success: self.discoveries_success.get(),
            discoveries_failure: self.discoveries_failure.get(),
            records_emitted: self.records_emitted.get(),
            collection_duration_seconds: HistogramStats::from(&self.collection_duration_seconds),
            last_collection_timestamp: self.last_collection_timestamp.get(),
        }
    }
}

/// Registry of per-service metrics, shared between the collector and the
/// HTTP layer
#[derive(Debug, Default)]
pub struct PluginMetrics {
    services: RwLock<BTreeMap<Service, Arc<ServiceMetrics>>>,
}

impl PluginMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics for `service`, created on first use
    pub fn service(&self, service: Service) -> Arc<ServiceMetrics> {
        if let Some(metrics) = self.services.read().expect("RwLock poisoned").get(&service) {
            return Arc::clone(metrics);
        }

        let mut services = self.services.write().expect("RwLock poisoned");
        Arc::clone(services.entry(service).or_default())
    }

    pub fn record_collection_success(&self, service: Service, records: usize, duration_seconds: f64) {
        let metrics = self.service(service);
        metrics.collections_success.inc();
        metrics.records_emitted.inc_by(records as u64);
        metrics.collection_duration_seconds.observe(duration_seconds);
        metrics.last_collection_timestamp.set_to_current_time();
    }

    pub fn record_collection_failure(&self, service: Service, duration_seconds: f64) {
        let metrics = self.service(service);
        metrics.collections_failure.inc();
        metrics.collection_duration_seconds.observe(duration_seconds);
    }

    pub fn record_discovery(&self, service: Service, success: bool) {
        let metrics = self.service(service);
        if success {
            metrics.discoveries_success.inc();
        } else {
            metrics.discoveries_failure.inc();
        }
    }

    /// Point-in-time copy of every service seen so far
    pub fn snapshot(&self) -> PluginStats {
        let services = self.services.read().expect("RwLock poisoned");
        PluginStats {
            version: env!("CARGO_PKG_VERSION"),
            services: services
                .iter()
                .map(|(service, metrics)| (service.to_string(), metrics.snapshot()))
                .collect(),
        }
    }
}

/// Serialized form served on `/stats`
#[derive(Debug, Clone, Serialize)]
pub struct PluginStats {
    pub version: &'static str,
    pub services: BTreeMap<String, ServiceStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub collections_success: u64,
    pub collections_failure: u64,
    pub discoveries_success: u64,
    pub discoveries_failure: u64,
    pub records_emitted: u64,
    pub collection_duration_seconds: HistogramStats,
    pub last_collection_timestamp: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramStats {
    pub count: u64,
    pub sum: f64,
    pub buckets: Vec<BucketStats>,
}

/// One cumulative bucket; `le` is a string so `+Inf` survives JSON
#[derive(Debug, Clone, Serialize)]
pub struct BucketStats {
    pub le: String,
    pub count: u64,
}

impl From<&Histogram> for HistogramStats {
    fn from(histogram: &Histogram) -> Self {
        Self {
            count: histogram.count(),
            sum: histogram.sum(),
            buckets: histogram
                .buckets()
                .into_iter()
                .map(|(bound, count)| BucketStats {
                    le: if bound.is_infinite() {
                        "+Inf".to_string()
                    } else {
                        bound.to_string()
                    },
                    count,
                })
                .collect(),
        }
    }
}
