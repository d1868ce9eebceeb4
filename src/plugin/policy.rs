//! Accepted configuration keys, as advertised to the host

use serde::Serialize;

/// Value type of a configuration key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Bool,
    Integer,
}

/// One accepted key under `mesos.`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRule {
    pub key: &'static str,
    pub kind: ValueKind,
    pub required: bool,
    /// Default rendered as text; `None` means unset
    pub default: Option<&'static str>,
    pub description: &'static str,
}

/// Every key the collector reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigPolicy {
    pub rules: Vec<PolicyRule>,
}

impl ConfigPolicy {
    pub fn rule(&self, key: &str) -> Option<&PolicyRule> {
        self.rules.iter().find(|r| r.key == key)
    }
}

/// `master` and `agent` are individually optional; validation requires at
/// least one of them.
pub fn config_policy() -> ConfigPolicy {
    ConfigPolicy {
        rules: vec![
            PolicyRule {
                key: "master",
                kind: ValueKind::String,
                required: false,
                default: None,
                description: "Mesos master endpoint (host:port)",
            },
            PolicyRule {
                key: "agent",
                kind: ValueKind::String,
                required: false,
                default: None,
                description: "Mesos agent endpoint (host:port)",
            },
            PolicyRule {
                key: "resolve_hostnames",
                kind: ValueKind::Bool,
                required: false,
                default: Some("true"),
                description: "Resolve hostnames when matching the leader redirect",
            },
            PolicyRule {
                key: "snapshot_timeout_ms",
                kind: ValueKind::Integer,
                required: false,
                default: Some("5000"),
                description: "Timeout for snapshot, flags, frameworks and redirect requests",
            },
            PolicyRule {
                key: "statistics_timeout_ms",
                kind: ValueKind::Integer,
                required: false,
                default: Some("30000"),
                description: "Timeout for executor statistics requests",
            },
            PolicyRule {
                key: "discovery",
                kind: ValueKind::String,
                required: false,
                default: Some("schema"),
                description: "Catalog source: 'schema' or 'sample'",
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MesosConfig;

    #[test]
    fn test_policy_defaults_match_config() {
        let policy = config_policy();
        let config = MesosConfig::default();

        assert_eq!(
            policy.rule("snapshot_timeout_ms").and_then(|r| r.default),
            Some(config.snapshot_timeout_ms.to_string().as_str())
        );
        assert_eq!(
            policy.rule("statistics_timeout_ms").and_then(|r| r.default),
            Some(config.statistics_timeout_ms.to_string().as_str())
        );
        assert_eq!(
            policy.rule("resolve_hostnames").and_then(|r| r.default),
            Some("true")
        );
    }

    #[test]
    fn test_endpoints_not_individually_required() {
        let policy = config_policy();
        assert!(!policy.rule("master").unwrap().required);
        assert!(!policy.rule("agent").unwrap().required);
        assert!(policy.rule("password").is_none());
    }
}
