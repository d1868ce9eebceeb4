//! Catalog builder
//!
//! Enumerates a record's leaves and filters them against the isolators the
//! polled agent has enabled.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

use crate::collector::Flags;

use super::namespace::{Namespace, Service};
use super::schema::LeafSource;

/// Agent flag listing enabled isolators (comma-separated)
pub const ISOLATION_FLAG: &str = "isolation";
/// Agent flag listing requested perf events (comma-separated)
pub const PERF_EVENTS_FLAG: &str = "perf_events";

/// Isolator gating `perf/*`
pub const PERF_ISOLATOR: &str = "cgroups/perf_event";
/// Isolators gating `disk_*`
pub const DISK_ISOLATORS: &[&str] = &["disk/du", "posix/disk"];
/// Isolator gating `net_*`
pub const NETWORK_ISOLATOR: &str = "network/port_mapping";

/// Reserved first segment of perf counters
pub const PERF_PREFIX: &str = "perf";

static PERF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^perf(/|$)").expect("static pattern compiles"));
static DISK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^disk_").expect("static pattern compiles"));
static NET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^net_").expect("static pattern compiles"));

/// Metric families the polled host can actually report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Normalized perf event names; `None` when the perf isolator is off
    pub perf_events: Option<Vec<String>>,
    /// Disk accounting isolator enabled
    pub disk: bool,
    /// Network accounting isolator enabled
    pub network: bool,
}

impl Capabilities {
    /// No optional metric family
    pub fn none() -> Self {
        Self::default()
    }

    /// Every optional family, with the given perf events
    pub fn all<S: AsRef<str>>(perf_events: &[S]) -> Self {
        Self {
            perf_events: Some(
                perf_events
                    .iter()
                    .map(|e| normalize_perf_event(e.as_ref()))
                    .collect(),
            ),
            disk: true,
            network: true,
        }
    }

    /// Derive capabilities from the agent's `/flags`
    pub fn from_flags(flags: &Flags) -> Self {
        let isolators: HashSet<&str> = split_list(flags.get(ISOLATION_FLAG)).collect();

        let perf_events = isolators.contains(PERF_ISOLATOR).then(|| {
            split_list(flags.get(PERF_EVENTS_FLAG))
                .map(normalize_perf_event)
                .collect()
        });

        Self {
            perf_events,
            disk: DISK_ISOLATORS.iter().any(|i| isolators.contains(i)),
            network: isolators.contains(NETWORK_ISOLATOR),
        }
    }
}

fn split_list(value: Option<&String>) -> impl Iterator<Item = &str> {
    value
        .map(String::as_str)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Apply the host's perf event naming: lower-case, `-` becomes `_`
pub fn normalize_perf_event(name: &str) -> String {
    name.trim().to_lowercase().replace('-', "_")
}

/// Ordered set of relative metric paths (`cpus_limit`, `perf/cycles`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPaths(BTreeSet<String>);

impl CatalogPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every leaf of `source`, unfiltered
    pub fn from_source<S: LeafSource + ?Sized>(source: &S) -> Self {
        Self(source.leaf_paths().into_iter().collect())
    }

    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        self.0.insert(path.into())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Union with another set
    pub fn merge(&mut self, other: CatalogPaths) {
        self.0.extend(other.0);
    }

    /// Drop every path matching `pattern`, returning how many went
    pub fn remove_matching(&mut self, pattern: &Regex) -> usize {
        let before = self.0.len();
        self.0.retain(|path| !pattern.is_match(path));
        before - self.0.len()
    }
}

impl<'a> IntoIterator for &'a CatalogPaths {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Enumerate `source` and filter it against `capabilities`
pub fn build_catalog<S: LeafSource + ?Sized>(source: &S, capabilities: &Capabilities) -> CatalogPaths {
    let mut paths = CatalogPaths::from_source(source);
    apply_capabilities(&mut paths, capabilities);
    paths
}

/// Remove metric families the host cannot report
///
/// With perf enabled the generic perf fields are swapped for one entry per
/// configured event.
pub fn apply_capabilities(paths: &mut CatalogPaths, capabilities: &Capabilities) {
    let removed = paths.remove_matching(&PERF_PATTERN);
    match &capabilities.perf_events {
        Some(events) => {
            for event in events {
                paths.insert(format!("{}/{}", PERF_PREFIX, event));
            }
            tracing::debug!(removed, events = events.len(), "Replaced generic perf fields");
        }
        None => tracing::debug!(removed, "Perf isolator disabled"),
    }

    if !capabilities.disk {
        let removed = paths.remove_matching(&DISK_PATTERN);
        tracing::debug!(removed, "Disk isolator disabled");
    }
    if !capabilities.network {
        let removed = paths.remove_matching(&NET_PATTERN);
        tracing::debug!(removed, "Network isolator disabled");
    }
}

/// Turn snapshot keys and per-entity paths into the service's namespaces
pub fn catalog_namespaces<'a, I>(service: Service, snapshot_keys: I, paths: &CatalogPaths) -> Vec<Namespace>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut keys: Vec<&String> = snapshot_keys.into_iter().collect();
    keys.sort();

    let flat = keys
        .into_iter()
        .map(|key| Namespace::new(service).add_static_elements(key.split('/')));
    let per_entity = paths
        .iter()
        .map(|path| Namespace::per_entity(service).add_static_elements(path.split('/')));

    flat.chain(per_entity).collect()
}
