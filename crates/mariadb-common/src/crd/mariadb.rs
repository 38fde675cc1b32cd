//! MariaDB CRD: a managed MariaDB server
//!
//! Only the fields the operator's controllers act on are modeled:
//! connection settings, the optional `my.cnf` ConfigMap, the metrics exporter
//! and TLS material references.

use std::collections::BTreeMap;

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Condition, ConfigMapKeySelector, LocalObjectReference, SecretKeySelector};
use crate::DEFAULT_MARIADB_PORT;

/// MariaDB is a managed MariaDB server.
///
/// Example:
/// ```yaml
/// apiVersion: k8s.mariadb.com/v1alpha1
/// kind: MariaDB
/// metadata:
///   name: mariadb
/// spec:
///   rootPasswordSecretKeyRef:
///     name: mariadb-root
///     key: password
///   metrics:
///     enabled: true
///     passwordSecretKeyRef:
///       name: mariadb-metrics
///       key: password
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "k8s.mariadb.com",
    version = "v1alpha1",
    kind = "MariaDB",
    plural = "mariadbs",
    shortname = "mdb",
    namespaced,
    status = "MariaDbStatus",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MariaDbSpec {
    /// Server image
    #[serde(default = "default_mariadb_image")]
    pub image: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: i32,

    /// Secret key holding the root password
    pub root_password_secret_key_ref: SecretKeySelector,

    /// ConfigMap key holding extra `my.cnf` configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_cnf_config_map_key_ref: Option<ConfigMapKeySelector>,

    /// Prometheus exporter configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MariaDbMetrics>,

    /// TLS configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<Tls>,

    /// Pull secrets shared by every pod the operator creates for this instance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
}

fn default_mariadb_image() -> String {
    "docker-registry1.mariadb.com/library/mariadb:11.4".to_string()
}

fn default_port() -> i32 {
    DEFAULT_MARIADB_PORT
}

/// Metrics exporter settings for a MariaDB instance
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MariaDbMetrics {
    /// Whether the exporter is deployed
    #[serde(default)]
    pub enabled: bool,

    /// Exporter Deployment settings
    #[serde(default)]
    pub exporter: Exporter,

    /// Database user the exporter connects as
    #[serde(default = "default_metrics_username")]
    pub username: String,

    /// Secret key holding the exporter user's password
    #[serde(default)]
    pub password_secret_key_ref: SecretKeySelector,
}

fn default_metrics_username() -> String {
    "mariadb-metrics".to_string()
}

/// Exporter Deployment settings shared by MariaDB and MaxScale
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exporter {
    /// Exporter image
    #[serde(default = "default_exporter_image")]
    pub image: String,

    /// Image pull policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    /// Port the exporter serves metrics on
    #[serde(default = "default_exporter_port")]
    pub port: i32,

    /// Extra arguments appended after the operator-managed ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Pull secrets for the exporter pod only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,

    /// Node selector for the exporter pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,

    /// Priority class for the exporter pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_class_name: Option<String>,
}

impl Default for Exporter {
    fn default() -> Self {
        Self {
            image: default_exporter_image(),
            image_pull_policy: None,
            port: default_exporter_port(),
            args: Vec::new(),
            image_pull_secrets: Vec::new(),
            node_selector: None,
            priority_class_name: None,
        }
    }
}

fn default_exporter_image() -> String {
    "prom/mysqld-exporter:v0.15.1".to_string()
}

fn default_exporter_port() -> i32 {
    9104
}

/// TLS settings for a MariaDB instance
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tls {
    /// Whether TLS is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Secret holding the CA that signs server certificates
    #[serde(
        default,
        rename = "serverCASecretRef",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_ca_secret_ref: Option<LocalObjectReference>,

    /// Secret holding the server certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_cert_secret_ref: Option<LocalObjectReference>,

    /// Secret holding the CA that signs client certificates
    #[serde(
        default,
        rename = "clientCASecretRef",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_ca_secret_ref: Option<LocalObjectReference>,

    /// Secret holding the client certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_secret_ref: Option<LocalObjectReference>,
}

/// MariaDB status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MariaDbStatus {
    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Key in the exporter config Secret holding the `my.cnf`-style client config
pub const EXPORTER_CONFIG_KEY: &str = "exporter.cnf";

impl MariaDB {
    /// Whether the metrics exporter should be deployed
    pub fn are_metrics_enabled(&self) -> bool {
        self.spec.metrics.as_ref().is_some_and(|m| m.enabled)
    }

    /// Whether TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.spec.tls.as_ref().is_some_and(|t| t.enabled)
    }

    /// Name of the exporter Deployment
    pub fn metrics_name(&self) -> String {
        format!("{}-metrics", self.name_any())
    }

    /// Secret key the operator writes the exporter client config to
    pub fn metrics_config_secret_key_ref(&self) -> SecretKeySelector {
        SecretKeySelector {
            name: format!("{}-metrics-config", self.name_any()),
            key: EXPORTER_CONFIG_KEY.to_string(),
        }
    }

    /// In-cluster DNS name of the server
    pub fn internal_host(&self) -> String {
        format!(
            "{}.{}.svc.cluster.local",
            self.name_any(),
            self.namespace().unwrap_or_else(|| "default".to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> MariaDbSpec {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn minimal_spec_gets_defaults() {
        let spec = parse(
            r#"
rootPasswordSecretKeyRef:
  name: root
  key: password
"#,
        );
        assert_eq!(spec.port, 3306);
        assert!(spec.metrics.is_none());
        assert!(spec.tls.is_none());
    }

    #[test]
    fn tls_refs_use_upper_case_ca_names() {
        let spec = parse(
            r#"
rootPasswordSecretKeyRef:
  name: root
  key: password
tls:
  enabled: true
  serverCASecretRef:
    name: server-ca
  clientCASecretRef:
    name: client-ca
"#,
        );
        let tls = spec.tls.unwrap();
        assert_eq!(tls.server_ca_secret_ref.unwrap().name, "server-ca");
        assert_eq!(tls.client_ca_secret_ref.unwrap().name, "client-ca");
    }

    #[test]
    fn metrics_helpers() {
        let mut mariadb = MariaDB::new(
            "mariadb",
            parse(
                r#"
rootPasswordSecretKeyRef:
  name: root
  key: password
metrics:
  enabled: true
"#,
            ),
        );
        mariadb.metadata.namespace = Some("db".into());

        assert!(mariadb.are_metrics_enabled());
        assert_eq!(mariadb.metrics_name(), "mariadb-metrics");
        assert_eq!(
            mariadb.metrics_config_secret_key_ref().name,
            "mariadb-metrics-config"
        );
        assert_eq!(mariadb.internal_host(), "mariadb.db.svc.cluster.local");
        assert_eq!(
            mariadb.spec.metrics.unwrap().exporter.image,
            "prom/mysqld-exporter:v0.15.1"
        );
    }
}
