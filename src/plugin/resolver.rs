//! Namespace resolver
//!
//! Maps requested namespaces onto concrete values from one service's live
//! sample: a flat snapshot plus a list of entities.

use serde::Serialize;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

use crate::catalog::{Namespace, Service};
use crate::collector::{Entity, MetricSnapshot};
use crate::error::{NamespaceError, PluginError};

/// Tag naming the polled host on every record
pub const SOURCE_TAG: &str = "source";

/// One collected value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    /// Concrete namespace; dynamic elements carry the entity identifiers
    pub namespace: Namespace,
    pub value: f64,
    /// Unix epoch milliseconds
    pub timestamp: u64,
    pub tags: HashMap<String, String>,
}

/// Live data of one service for one collection pass
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub service: Service,
    /// Polled host, used as the `source` tag
    pub source: &'a str,
    pub timestamp: SystemTime,
    pub snapshot: &'a MetricSnapshot,
    pub entities: &'a [Entity],
}

/// Resolve every requested namespace against `sample`
///
/// A flat namespace missing from the snapshot fails the whole call. A
/// per-entity namespace skips entities lacking the statistic, since
/// availability varies per executor. Record order is unspecified.
pub fn resolve(requested: &[Namespace], sample: &Sample<'_>) -> Result<Vec<Metric>, PluginError> {
    let timestamp = unix_millis(sample.timestamp);
    let tags = HashMap::from([(SOURCE_TAG.to_string(), sample.source.to_string())]);
    let mut metrics = Vec::new();

    for namespace in requested {
        let service = namespace.validate()?;
        if service != sample.service {
            return Err(NamespaceError::InvalidLayout {
                namespace: namespace.to_string(),
                reason: format!("resolved against a {} sample", sample.service),
            }
            .into());
        }

        let mut emit = |namespace: Namespace, value: f64| {
            metrics.push(Metric {
                namespace,
                value,
                timestamp,
                tags: tags.clone(),
            })
        };

        if namespace.is_dynamic() {
            resolve_per_entity(namespace, service, sample.entities, &mut emit);
        } else {
            let value = resolve_flat(namespace, sample.snapshot)?;
            emit(namespace.clone(), value);
        }
    }

    Ok(metrics)
}

fn resolve_flat(namespace: &Namespace, snapshot: &MetricSnapshot) -> Result<f64, PluginError> {
    snapshot
        .get(&namespace.key(1))
        .copied()
        .ok_or_else(|| PluginError::MissingMetric {
            namespace: namespace.to_string(),
        })
}

fn resolve_per_entity(
    namespace: &Namespace,
    service: Service,
    entities: &[Entity],
    emit: &mut impl FnMut(Namespace, f64),
) {
    let depth = service.depth();
    let selectors = &namespace.elements()[1..=depth];
    let statistic = namespace.suffix(depth + 1);

    for entity in entities {
        let chain = entity.id_chain();
        if chain.len() != depth {
            continue;
        }

        // A literal at a dynamic position narrows the match to that entity.
        let selected = selectors
            .iter()
            .zip(&chain)
            .all(|(selector, id)| selector.is_wildcard() || selector.value == *id);
        if !selected {
            continue;
        }

        match entity.statistics.lookup(&statistic) {
            Some(value) => emit(namespace.resolve(&chain), value),
            None => trace!(
                entity = %entity.id,
                statistic = %statistic.join("/"),
                "Statistic not reported by entity"
            ),
        }
    }
}

/// Milliseconds since the Unix epoch, zero for pre-epoch times
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::StatValue;
    use std::time::Duration;

    fn executor(framework: &str, id: &str, stats: serde_json::Value) -> Entity {
        Entity {
            id: id.to_string(),
            parent_id: Some(framework.to_string()),
            name: format!("{}-name", id),
            source: format!("{}-source", id),
            statistics: StatValue::from_json(stats).unwrap(),
        }
    }

    fn sample<'a>(snapshot: &'a MetricSnapshot, entities: &'a [Entity]) -> Sample<'a> {
        Sample {
            service: Service::Agent,
            source: "10.0.0.5:5051",
            timestamp: UNIX_EPOCH + Duration::from_secs(1_600_000_000),
            snapshot,
            entities,
        }
    }

    fn ns(s: &str) -> Namespace {
        s.parse().unwrap()
    }

    #[test]
    fn test_resolve_flat() {
        let snapshot = MetricSnapshot::from([("system/cpus_total".to_string(), 2.0)]);
        let metrics = resolve(&[ns("agent/system/cpus_total")], &sample(&snapshot, &[])).unwrap();

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value, 2.0);
        assert_eq!(metrics[0].timestamp, 1_600_000_000_000);
        assert_eq!(
            metrics[0].tags.get(SOURCE_TAG).map(String::as_str),
            Some("10.0.0.5:5051")
        );
    }

    #[test]
    fn test_resolve_flat_missing_is_error() {
        let snapshot = MetricSnapshot::from([("system/cpus_total".to_string(), 0.0)]);
        let err = resolve(
            &[ns("agent/system/cpus_total"), ns("agent/system/mem_total_bytes")],
            &sample(&snapshot, &[]),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            PluginError::MissingMetric { ref namespace } if namespace == "agent/system/mem_total_bytes"
        ));
    }

    #[test]
    fn test_resolve_wildcard_skips_entities_without_statistic() {
        let entities = vec![
            executor("fw-1", "e1", serde_json::json!({"cpus_limit": 1.1})),
            executor("fw-1", "e2", serde_json::json!({"mem_rss_bytes": 1024})),
            executor("fw-2", "e3", serde_json::json!({"cpus_limit": 0.5})),
            executor("fw-2", "e4", serde_json::json!({})),
        ];
        let snapshot = MetricSnapshot::new();

        let metrics = resolve(&[ns("agent/*/*/cpus_limit")], &sample(&snapshot, &entities)).unwrap();

        assert_eq!(metrics.len(), entities.len() - 2);
        let mut names: Vec<String> = metrics.iter().map(|m| m.namespace.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["agent/fw-1/e1/cpus_limit", "agent/fw-2/e3/cpus_limit"]
        );
    }

    #[test]
    fn test_resolve_nested_statistic() {
        let entities = vec![executor(
            "fw-1",
            "e1",
            serde_json::json!({"perf": {"cycles": 42}}),
        )];
        let snapshot = MetricSnapshot::new();

        let metrics = resolve(&[ns("agent/*/*/perf/cycles")], &sample(&snapshot, &entities)).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value, 42.0);
        assert_eq!(metrics[0].namespace.elements()[1].value, "fw-1");
        assert_eq!(metrics[0].namespace.elements()[2].value, "e1");
    }

    #[test]
    fn test_resolve_literal_identifier_filters() {
        let entities = vec![
            executor("fw-1", "e1", serde_json::json!({"cpus_limit": 1.0})),
            executor("fw-2", "e2", serde_json::json!({"cpus_limit": 2.0})),
        ];
        let snapshot = MetricSnapshot::new();

        let metrics = resolve(&[ns("agent/fw-2/*/cpus_limit")], &sample(&snapshot, &entities)).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value, 2.0);
    }

    #[test]
    fn test_resolve_master_frameworks() {
        let frameworks = vec![Entity {
            id: "fw-1".to_string(),
            parent_id: None,
            name: "marathon".to_string(),
            source: "node-1".to_string(),
            statistics: StatValue::from_json(serde_json::json!({"used_resources": {"cpus": 1.5}}))
                .unwrap(),
        }];
        let snapshot = MetricSnapshot::new();
        let sample = Sample {
            service: Service::Master,
            ..sample(&snapshot, &frameworks)
        };

        let metrics = resolve(&[ns("master/*/used_resources/cpus")], &sample).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].namespace.to_string(), "master/fw-1/used_resources/cpus");
    }

    #[test]
    fn test_resolve_rejects_other_service() {
        let snapshot = MetricSnapshot::from([("system/cpus_total".to_string(), 2.0)]);
        let err = resolve(&[ns("master/system/cpus_total")], &sample(&snapshot, &[])).unwrap_err();
        assert!(matches!(err, PluginError::Namespace(_)));
    }
}
