//! Metric catalog module
//!
//! Derives the set of addressable metric namespaces for a service from
//! record field tables (or live samples) and the host's enabled isolators.
//!
//! # Example
//!
//! ```ignore
//! use mesos_collector::catalog::{build_catalog, Capabilities, RESOURCE_STATISTICS};
//!
//! let paths = build_catalog(RESOURCE_STATISTICS, &Capabilities::from_flags(&flags));
//! assert!(paths.contains("cpus_limit"));
//! ```

pub mod builder;
pub mod namespace;
pub mod schema;

pub use builder::{
    apply_capabilities, build_catalog, catalog_namespaces, normalize_perf_event, Capabilities,
    CatalogPaths,
};
pub use namespace::{Namespace, NamespaceElement, Service, WILDCARD};
pub use schema::{Field, LeafSource, FRAMEWORK, RESOURCE_STATISTICS};
