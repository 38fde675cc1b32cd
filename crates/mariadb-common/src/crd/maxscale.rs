//! MaxScale CRD: a MaxScale proxy in front of a MariaDB instance

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::mariadb::Exporter;
use super::types::{Condition, LocalObjectReference, MariaDbRef, SecretKeySelector};

/// MaxScale is a database proxy fronting a MariaDB instance.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "k8s.mariadb.com",
    version = "v1alpha1",
    kind = "MaxScale",
    plural = "maxscales",
    shortname = "mxs",
    namespaced,
    status = "MaxScaleStatus",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MaxScaleSpec {
    /// MariaDB instance this proxy fronts
    #[serde(rename = "mariaDbRef")]
    pub mariadb_ref: MariaDbRef,

    /// Port of the MaxScale REST API
    #[serde(default = "default_admin_port")]
    pub admin_port: i32,

    /// Credentials used by MaxScale and its exporter
    #[serde(default)]
    pub auth: MaxScaleAuth,

    /// Prometheus exporter configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MaxScaleMetrics>,

    /// Pull secrets shared by every pod the operator creates for this proxy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
}

fn default_admin_port() -> i32 {
    8989
}

/// MaxScale credentials
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaxScaleAuth {
    /// REST API user the exporter authenticates as
    #[serde(default = "default_metrics_username")]
    pub metrics_username: String,

    /// Secret key holding the exporter user's password
    #[serde(default)]
    pub metrics_password_secret_key_ref: SecretKeySelector,
}

impl Default for MaxScaleAuth {
    fn default() -> Self {
        Self {
            metrics_username: default_metrics_username(),
            metrics_password_secret_key_ref: SecretKeySelector::default(),
        }
    }
}

fn default_metrics_username() -> String {
    "metrics".to_string()
}

/// Metrics exporter settings for a MaxScale proxy
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaxScaleMetrics {
    /// Whether the exporter is deployed
    #[serde(default)]
    pub enabled: bool,

    /// Exporter Deployment settings
    #[serde(default = "default_maxscale_exporter")]
    pub exporter: Exporter,
}

impl Default for MaxScaleMetrics {
    fn default() -> Self {
        Self {
            enabled: false,
            exporter: default_maxscale_exporter(),
        }
    }
}

fn default_maxscale_exporter() -> Exporter {
    Exporter {
        image: "mariadb/maxscale-prometheus-exporter-ubi:v0.0.1".to_string(),
        port: 9105,
        ..Exporter::default()
    }
}

/// MaxScale status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaxScaleStatus {
    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Key in the exporter config Secret holding the exporter's ini config
pub const MAXSCALE_EXPORTER_CONFIG_KEY: &str = "exporter.ini";

impl MaxScale {
    /// Whether the metrics exporter should be deployed
    pub fn are_metrics_enabled(&self) -> bool {
        self.spec.metrics.as_ref().is_some_and(|m| m.enabled)
    }

    /// Name of the exporter Deployment
    pub fn metrics_name(&self) -> String {
        format!("{}-metrics", self.name_any())
    }

    /// Secret key the operator writes the exporter config to
    pub fn metrics_config_secret_key_ref(&self) -> SecretKeySelector {
        SecretKeySelector {
            name: format!("{}-metrics-config", self.name_any()),
            key: MAXSCALE_EXPORTER_CONFIG_KEY.to_string(),
        }
    }

    /// Base URL of the MaxScale REST API
    pub fn admin_url(&self) -> String {
        format!(
            "http://{}.{}.svc.cluster.local:{}",
            self.name_any(),
            self.namespace().unwrap_or_else(|| "default".to_string()),
            self.spec.admin_port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_defaults_use_maxscale_exporter() {
        let spec: MaxScaleSpec = serde_yaml::from_str(
            r#"
mariaDbRef:
  name: mariadb
metrics:
  enabled: true
"#,
        )
        .unwrap();
        let metrics = spec.metrics.unwrap();
        assert!(metrics.enabled);
        assert_eq!(metrics.exporter.port, 9105);
        assert_eq!(spec.auth.metrics_username, "metrics");
        assert!(spec.auth.metrics_password_secret_key_ref.name.is_empty());
    }

    #[test]
    fn admin_url_uses_service_dns() {
        let mut mxs = MaxScale::new(
            "maxscale",
            MaxScaleSpec {
                mariadb_ref: MariaDbRef {
                    name: "mariadb".into(),
                    namespace: None,
                },
                admin_port: 8989,
                auth: MaxScaleAuth::default(),
                metrics: None,
                image_pull_secrets: vec![],
            },
        );
        mxs.metadata.namespace = Some("db".into());
        assert_eq!(mxs.admin_url(), "http://maxscale.db.svc.cluster.local:8989");
        assert!(!mxs.are_metrics_enabled());
    }
}
