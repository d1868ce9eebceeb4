//! Mesos JSON response decoders
//!
//! Turns raw endpoint bodies into flat snapshots, entity records and flag
//! maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::CollectorError;

/// Collector operation result type
pub type CollectResult<T> = Result<T, CollectorError>;

/// Flat `/metrics/snapshot` payload, keyed by the upstream slash-delimited name
pub type MetricSnapshot = HashMap<String, f64>;

/// Flags reported by `/flags`, all values rendered as strings
pub type Flags = HashMap<String, String>;

/// Loosely typed statistics value
///
/// Only numbers and objects survive decoding; strings, booleans, nulls and
/// arrays are not addressable as metrics and are dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    /// Numeric leaf
    Number(f64),
    /// Nested record (e.g. `perf`, `offered_resources`)
    Map(HashMap<String, StatValue>),
}

impl Default for StatValue {
    fn default() -> Self {
        StatValue::Map(HashMap::new())
    }
}

impl StatValue {
    /// Convert a JSON value, dropping everything that is not numeric
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(StatValue::Number),
            Value::Object(map) => Some(Self::from_object(map)),
            _ => None,
        }
    }

    /// Convert a JSON object; non-numeric members are skipped
    pub fn from_object(map: Map<String, Value>) -> Self {
        StatValue::Map(
            map.into_iter()
                .filter_map(|(k, v)| Self::from_json(v).map(|v| (k, v)))
                .collect(),
        )
    }

    /// Numeric value of a leaf
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Number(n) => Some(*n),
            StatValue::Map(_) => None,
        }
    }

    /// Child of a map node
    pub fn get(&self, key: &str) -> Option<&StatValue> {
        match self {
            StatValue::Map(map) => map.get(key),
            StatValue::Number(_) => None,
        }
    }

    /// Walk `path` and return the numeric leaf at its end
    ///
    /// Returns `None` if any segment is missing or the path ends on a map.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<f64> {
        path.iter()
            .try_fold(self, |node, segment| node.get(segment.as_ref()))
            .and_then(StatValue::as_f64)
    }

    /// Insert a numeric leaf into a map node; no-op on a number
    pub fn insert(&mut self, key: &str, value: f64) {
        if let StatValue::Map(map) = self {
            map.insert(key.to_string(), StatValue::Number(value));
        }
    }
}

/// An executor (agent) or framework (master) with its statistics
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Executor or framework ID
    pub id: String,
    /// Owning framework ID for executors
    pub parent_id: Option<String>,
    /// Human-readable name
    pub name: String,
    /// Source tag (executor source, framework hostname)
    pub source: String,
    /// Numeric statistics
    pub statistics: StatValue,
}

impl Entity {
    /// Identifier chain from the outermost entity down: `[framework, executor]`
    /// for executors, `[framework]` for frameworks
    pub fn id_chain(&self) -> Vec<&str> {
        match &self.parent_id {
            Some(parent) => vec![parent.as_str(), self.id.as_str()],
            None => vec![self.id.as_str()],
        }
    }
}

/// Parse a `/metrics/snapshot` body
pub fn parse_snapshot(body: &[u8]) -> CollectResult<MetricSnapshot> {
    serde_json::from_slice(body).map_err(|e| CollectorError::JsonParse(e.to_string()))
}

/// Parse a `/monitor/statistics` body into executor entities
pub fn parse_executors(body: &[u8]) -> CollectResult<Vec<Entity>> {
    let raw: Vec<RawExecutor> =
        serde_json::from_slice(body).map_err(|e| CollectorError::JsonParse(e.to_string()))?;

    Ok(raw
        .into_iter()
        .map(|e| Entity {
            id: e.executor_id,
            parent_id: Some(e.framework_id),
            name: e.executor_name,
            source: e.source,
            statistics: StatValue::from_object(e.statistics),
        })
        .collect())
}

/// Parse a `/master/frameworks` body into framework entities
///
/// Only active frameworks are reported; completed and unregistered ones are
/// ignored.
pub fn parse_frameworks(body: &[u8]) -> CollectResult<Vec<Entity>> {
    let raw: RawFrameworks =
        serde_json::from_slice(body).map_err(|e| CollectorError::JsonParse(e.to_string()))?;

    raw.frameworks
        .into_iter()
        .map(|framework| {
            let text = |key: &str| {
                framework
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let id = text("id");
            if id.is_empty() {
                return Err(CollectorError::JsonParse(
                    "framework record without 'id'".to_string(),
                ));
            }
            let name = text("name");
            let source = text("hostname");

            Ok(Entity {
                id,
                parent_id: None,
                name,
                source,
                statistics: StatValue::from_object(framework),
            })
        })
        .collect()
}

/// Parse a `/flags` body
pub fn parse_flags(body: &[u8]) -> CollectResult<Flags> {
    let raw: RawFlags =
        serde_json::from_slice(body).map_err(|e| CollectorError::JsonParse(e.to_string()))?;

    Ok(raw
        .flags
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect())
}

/// Wire shapes, converted into the public types after decoding
#[derive(Deserialize)]
struct RawExecutor {
    executor_id: String,
    #[serde(default)]
    executor_name: String,
    framework_id: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    statistics: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawFrameworks {
    #[serde(default)]
    frameworks: Vec<Map<String, Value>>,
}

#[derive(Deserialize)]
struct RawFlags {
    #[serde(default)]
    flags: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot() {
        let json = br#"{
            "containerizer/mesos/container_destroy_errors": 0.0,
            "slave/cpus_percent": 0.0,
            "system/cpus_total": 2
        }"#;

        let snapshot = parse_snapshot(json).unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get("system/cpus_total"), Some(&2.0));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let json = br#"{"master/tasks_running": 12, "system/load_5min": 0.25, "registrar/state_store_ms/p99": 3.5}"#;
        let snapshot = parse_snapshot(json).unwrap();

        let encoded = serde_json::to_vec(&snapshot).unwrap();
        let decoded = parse_snapshot(&encoded).unwrap();

        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.get("master/tasks_running"), Some(&12.0));
    }

    #[test]
    fn test_parse_snapshot_rejects_non_numeric() {
        let json = br#"{"system/cpus_total": "two"}"#;
        assert!(matches!(
            parse_snapshot(json),
            Err(CollectorError::JsonParse(_))
        ));
    }

    #[test]
    fn test_parse_executors() {
        let json = br#"[
            {
                "executor_id": "id1",
                "executor_name": "name1",
                "framework_id": "frame1",
                "source": "source1",
                "statistics": {
                    "stat_a": 1.1,
                    "stat_b": 2.2,
                    "perf": {"perf_1": 3.3, "label": "ignored"}
                }
            },
            {
                "executor_id": "id2",
                "executor_name": "name2",
                "framework_id": "frame2",
                "source": "source2",
                "statistics": {"stat_c": 4.4, "stat_d": 5.5}
            }
        ]"#;

        let executors = parse_executors(json).unwrap();
        assert_eq!(executors.len(), 2);

        let first = &executors[0];
        assert_eq!(first.id, "id1");
        assert_eq!(first.parent_id.as_deref(), Some("frame1"));
        assert_eq!(first.id_chain(), vec!["frame1", "id1"]);
        assert_eq!(first.statistics.lookup(&["stat_a"]), Some(1.1));
        assert_eq!(first.statistics.lookup(&["perf", "perf_1"]), Some(3.3));
        assert_eq!(first.statistics.lookup(&["perf", "label"]), None);
        assert_eq!(first.statistics.lookup(&["stat_c"]), None);

        assert_eq!(executors[1].statistics.lookup(&["stat_d"]), Some(5.5));
    }

    #[test]
    fn test_lookup_on_map_is_none() {
        let stats = StatValue::from_json(serde_json::json!({"perf": {"cycles": 1}})).unwrap();
        assert_eq!(stats.lookup(&["perf"]), None);
        assert_eq!(stats.lookup(&["perf", "cycles"]), Some(1.0));
    }

    #[test]
    fn test_parse_frameworks() {
        let json = br#"{
            "frameworks": [{
                "id": "fw-1",
                "name": "marathon",
                "hostname": "node-1",
                "active": true,
                "registered_time": 1500000000.5,
                "used_resources": {"cpus": 1.5, "mem": 512, "ports": "[31000-31001]"},
                "tasks": [{"id": "t1"}]
            }],
            "completed_frameworks": []
        }"#;

        let frameworks = parse_frameworks(json).unwrap();
        assert_eq!(frameworks.len(), 1);

        let fw = &frameworks[0];
        assert_eq!(fw.id, "fw-1");
        assert_eq!(fw.source, "node-1");
        assert_eq!(fw.id_chain(), vec!["fw-1"]);
        assert_eq!(fw.statistics.lookup(&["used_resources", "cpus"]), Some(1.5));
        assert_eq!(fw.statistics.lookup(&["used_resources", "ports"]), None);
        assert_eq!(fw.statistics.lookup(&["registered_time"]), Some(1500000000.5));
        assert!(fw.statistics.get("tasks").is_none());
        assert!(fw.statistics.get("active").is_none());
    }

    #[test]
    fn test_parse_frameworks_requires_id() {
        let json = br#"{"frameworks": [{"name": "nameless"}]}"#;
        assert!(parse_frameworks(json).is_err());
    }

    #[test]
    fn test_parse_flags() {
        let json = br#"{"flags": {
            "isolation": "cgroups/cpu,cgroups/mem",
            "perf_events": "cycles,task-clock",
            "port": 5051
        }}"#;

        let flags = parse_flags(json).unwrap();
        assert_eq!(flags.get("isolation").map(String::as_str), Some("cgroups/cpu,cgroups/mem"));
        assert_eq!(flags.get("port").map(String::as_str), Some("5051"));
    }
}
