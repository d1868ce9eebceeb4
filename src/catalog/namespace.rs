//! Metric namespaces
//!
//! A namespace is an ordered list of elements. The first element names the
//! service; dynamic elements stand for entity identifiers and are only filled
//! in at collection time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NamespaceError;

/// Placeholder value of an unresolved dynamic element
pub const WILDCARD: &str = "*";

/// Polled Mesos service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Controller node
    Master,
    /// Worker node
    Agent,
}

impl Service {
    /// All services, in collection order
    pub const ALL: [Service; 2] = [Service::Master, Service::Agent];

    /// Namespace root element
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Master => "master",
            Service::Agent => "agent",
        }
    }

    /// Dynamic elements following the root, as `(name, description)`
    ///
    /// Agent entities are executors nested under frameworks; master entities
    /// are frameworks.
    pub fn dynamic_elements(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Service::Master => &[("framework_id", "Framework ID")],
            Service::Agent => &[
                ("framework_id", "Framework ID"),
                ("executor_id", "Executor ID"),
            ],
        }
    }

    /// Number of dynamic elements in a per-entity namespace
    pub fn depth(&self) -> usize {
        self.dynamic_elements().len()
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = NamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(Service::Master),
            "agent" => Ok(Service::Agent),
            other => Err(NamespaceError::UnknownService(other.to_string())),
        }
    }
}

/// One namespace element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceElement {
    /// Literal value, or `*` for an unresolved dynamic element
    pub value: String,
    /// Identifier kind; set only on dynamic elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl NamespaceElement {
    /// Literal element
    pub fn new_static(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name: None,
            description: String::new(),
        }
    }

    /// Unresolved dynamic element
    pub fn new_dynamic(name: &str, description: &str) -> Self {
        Self {
            value: WILDCARD.to_string(),
            name: Some(name.to_string()),
            description: description.to_string(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.name.is_some()
    }

    /// Dynamic element still matching any identifier
    pub fn is_wildcard(&self) -> bool {
        self.value == WILDCARD
    }
}

/// Metric namespace such as `agent/*/*/cpus_limit` or `master/system/load_5min`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(Vec<NamespaceElement>);

impl Namespace {
    /// Namespace holding only the service root
    pub fn new(service: Service) -> Self {
        Self(vec![NamespaceElement::new_static(service.as_str())])
    }

    /// Service root followed by the service's dynamic elements
    pub fn per_entity(service: Service) -> Self {
        let mut ns = Self::new(service);
        ns.0.extend(
            service
                .dynamic_elements()
                .iter()
                .map(|(name, description)| NamespaceElement::new_dynamic(name, description)),
        );
        ns
    }

    /// Append literal elements
    pub fn add_static_elements<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .extend(values.into_iter().map(NamespaceElement::new_static));
        self
    }

    pub fn elements(&self) -> &[NamespaceElement] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any element is dynamic
    pub fn is_dynamic(&self) -> bool {
        self.0.iter().any(NamespaceElement::is_dynamic)
    }

    /// Element values from `start` on
    pub fn suffix(&self, start: usize) -> Vec<&str> {
        self.0
            .iter()
            .skip(start)
            .map(|e| e.value.as_str())
            .collect()
    }

    /// Element values from `start` on, joined with `/`
    pub fn key(&self, start: usize) -> String {
        self.suffix(start).join("/")
    }

    /// Check the root and the dynamic layout, returning the service
    ///
    /// Dynamic elements may only sit at positions `1..=depth`, and a dynamic
    /// namespace must name a statistic after them.
    pub fn validate(&self) -> Result<Service, NamespaceError> {
        let root = self
            .0
            .first()
            .ok_or_else(|| NamespaceError::EmptySegment(String::new()))?;
        let service: Service = root.value.parse()?;

        if self.0.iter().any(|e| e.value.is_empty()) {
            return Err(NamespaceError::EmptySegment(self.to_string()));
        }
        if root.is_dynamic() {
            return Err(self.layout_error("service element cannot be dynamic"));
        }

        if !self.is_dynamic() {
            if self.0.len() < 2 {
                return Err(self.layout_error("no metric named after the service"));
            }
            return Ok(service);
        }

        let depth = service.depth();
        if let Some(pos) = self.0.iter().position(|e| e.is_dynamic()) {
            if pos > depth {
                return Err(self.layout_error(&format!(
                    "dynamic element at position {}, {} allows them only at 1..={}",
                    pos, service, depth
                )));
            }
        }
        if self.0.iter().skip(depth + 1).any(NamespaceElement::is_dynamic) {
            return Err(self.layout_error(&format!(
                "{} namespaces have exactly {} dynamic element(s)",
                service, depth
            )));
        }
        if self.0.len() <= depth + 1 {
            return Err(self.layout_error("no statistic after the dynamic elements"));
        }

        Ok(service)
    }

    /// Copy with the first `ids.len()` positions after the root set to `ids`
    pub fn resolve(&self, ids: &[&str]) -> Namespace {
        let mut resolved = self.clone();
        for (element, id) in resolved.0.iter_mut().skip(1).zip(ids) {
            element.value = id.to_string();
        }
        resolved
    }

    fn layout_error(&self, reason: &str) -> NamespaceError {
        NamespaceError::InvalidLayout {
            namespace: self.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key(0))
    }
}

impl FromStr for Namespace {
    type Err = NamespaceError;

    /// Parse `agent/*/*/cpus_limit`; `*` marks the service's dynamic
    /// positions and is rejected anywhere else
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = s.trim().trim_matches('/').split('/');
        let root = segments.next().unwrap_or_default();
        let service: Service = root.parse()?;
        let dynamic = service.dynamic_elements();

        let mut ns = Namespace::new(service);
        for (i, segment) in segments.enumerate() {
            if segment.is_empty() {
                return Err(NamespaceError::EmptySegment(s.to_string()));
            }
            let element = match (segment, dynamic.get(i)) {
                (WILDCARD, Some((name, description))) => {
                    NamespaceElement::new_dynamic(name, description)
                }
                (WILDCARD, None) => {
                    return Err(NamespaceError::InvalidLayout {
                        namespace: s.to_string(),
                        reason: format!("wildcard at position {}", i + 1),
                    })
                }
                (literal, _) => NamespaceElement::new_static(literal),
            };
            ns.0.push(element);
        }

        ns.validate()?;
        Ok(ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_static() {
        let ns: Namespace = "agent/system/cpus_total".parse().unwrap();
        assert!(!ns.is_dynamic());
        assert_eq!(ns.validate().unwrap(), Service::Agent);
        assert_eq!(ns.key(1), "system/cpus_total");
        assert_eq!(ns.to_string(), "agent/system/cpus_total");
    }

    #[test]
    fn test_parse_dynamic_agent() {
        let ns: Namespace = "agent/*/*/perf/cycles".parse().unwrap();
        assert!(ns.is_dynamic());
        assert_eq!(ns.elements()[1].name.as_deref(), Some("framework_id"));
        assert_eq!(ns.elements()[2].name.as_deref(), Some("executor_id"));
        assert_eq!(ns.suffix(3), vec!["perf", "cycles"]);
    }

    #[test]
    fn test_parse_rejects_misplaced_wildcard() {
        assert!(matches!(
            "master/*/*/used_resources/cpus".parse::<Namespace>(),
            Err(NamespaceError::InvalidLayout { .. })
        ));
        assert!(matches!(
            "agent/system/*".parse::<Namespace>(),
            Err(NamespaceError::InvalidLayout { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_service() {
        assert_eq!(
            "scheduler/foo".parse::<Namespace>(),
            Err(NamespaceError::UnknownService("scheduler".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        assert!(matches!(
            "agent//cpus_total".parse::<Namespace>(),
            Err(NamespaceError::EmptySegment(_))
        ));
    }

    #[test]
    fn test_dynamic_without_statistic_rejected() {
        assert!("agent/*/*".parse::<Namespace>().is_err());
    }

    #[test]
    fn test_per_entity_and_resolve() {
        let ns = Namespace::per_entity(Service::Agent).add_static_elements(["cpus_limit"]);
        assert_eq!(ns.to_string(), "agent/*/*/cpus_limit");
        assert!(ns.validate().is_ok());

        let resolved = ns.resolve(&["fw-1", "exec-1"]);
        assert_eq!(resolved.to_string(), "agent/fw-1/exec-1/cpus_limit");
        assert_eq!(resolved.elements()[2].name.as_deref(), Some("executor_id"));
    }

    #[test]
    fn test_serde_transparent() {
        let ns = Namespace::per_entity(Service::Master).add_static_elements(["resources", "cpus"]);
        let json = serde_json::to_value(&ns).unwrap();
        assert_eq!(json[1]["value"], "*");
        assert_eq!(json[1]["name"], "framework_id");
        assert!(json[2].get("name").is_none());

        let back: Namespace = serde_json::from_value(json).unwrap();
        assert_eq!(back, ns);
    }
}
