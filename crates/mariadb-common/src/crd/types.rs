//! Shared types used across the operator's CRDs

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to a key inside a Secret in the same namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Secret name
    #[serde(default)]
    pub name: String,
    /// Key within the Secret's data
    #[serde(default)]
    pub key: String,
}

/// Reference to a key inside a ConfigMap in the same namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapKeySelector {
    /// Nested object reference, flattened as `name` on the wire
    #[serde(flatten)]
    pub local_object_reference: LocalObjectReference,
    /// Key within the ConfigMap's data
    #[serde(default)]
    pub key: String,
}

/// Reference to an object by name in the same namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct LocalObjectReference {
    /// Object name
    #[serde(default)]
    pub name: String,
}

impl LocalObjectReference {
    /// Create a reference to the named object
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Reference to a MariaDB instance, optionally in another namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MariaDbRef {
    /// MariaDB resource name
    pub name: String,
    /// MariaDB namespace; defaults to the referencing object's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl MariaDbRef {
    /// Namespace of the referenced MariaDB, falling back to `default_ns`
    pub fn namespace_or<'a>(&'a self, default_ns: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default_ns)
    }
}

/// Status of a condition
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition for status reporting
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., Ready)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    pub message: String,

    /// Last time the condition transitioned
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// `Ready=True` condition
    pub fn ready(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(CONDITION_READY, ConditionStatus::True, reason, message)
    }

    /// `Ready=False` condition
    pub fn not_ready(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(CONDITION_READY, ConditionStatus::False, reason, message)
    }
}

/// Condition type reported by every controller
pub const CONDITION_READY: &str = "Ready";

/// Insert or replace a condition by type.
///
/// The previous transition time is kept when the status did not change, so a
/// periodic reconcile does not make the condition look freshly flipped.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

/// Whether the `Ready` condition is present and true
pub fn is_ready(conditions: &[Condition]) -> bool {
    conditions
        .iter()
        .any(|c| c.type_ == CONDITION_READY && c.status == ConditionStatus::True)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn config_map_key_selector_flattens_name() {
        let selector: ConfigMapKeySelector =
            serde_json::from_str(r#"{"name":"my-cnf","key":"my.cnf"}"#).unwrap();
        assert_eq!(selector.local_object_reference.name, "my-cnf");
        assert_eq!(selector.key, "my.cnf");
    }

    #[test]
    fn mariadb_ref_defaults_to_owner_namespace() {
        let same = MariaDbRef {
            name: "mariadb".into(),
            namespace: None,
        };
        let other = MariaDbRef {
            name: "mariadb".into(),
            namespace: Some("db".into()),
        };
        assert_eq!(same.namespace_or("app"), "app");
        assert_eq!(other.namespace_or("app"), "db");
    }

    #[test]
    fn set_condition_keeps_transition_time_when_status_unchanged() {
        let mut first = Condition::ready("Created", "ok");
        first.last_transition_time = Utc::now() - Duration::hours(1);
        let original_time = first.last_transition_time;
        let mut conditions = vec![first];

        set_condition(&mut conditions, Condition::ready("Created", "still ok"));

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time, original_time);
        assert_eq!(conditions[0].message, "still ok");
    }

    #[test]
    fn set_condition_updates_transition_time_on_flip() {
        let mut first = Condition::ready("Created", "ok");
        first.last_transition_time = Utc::now() - Duration::hours(1);
        let original_time = first.last_transition_time;
        let mut conditions = vec![first];

        set_condition(&mut conditions, Condition::not_ready("Failed", "boom"));

        assert!(conditions[0].last_transition_time > original_time);
        assert!(!is_ready(&conditions));
    }
}
