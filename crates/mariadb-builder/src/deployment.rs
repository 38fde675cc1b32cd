//! Metrics exporter Deployments
//!
//! One single-container Deployment per monitored instance. The exporter reads
//! its credentials from the config Secret built in [`crate::secret`], mounted
//! read-only under `/etc/config/`.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, HTTPGetAction, LocalObjectReference as PullSecretRef, PodSpec,
    PodTemplateSpec, Probe, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use mariadb_common::crd::{Exporter, LocalObjectReference, MariaDB, MaxScale};
use mariadb_common::{Error, Result};

use crate::labels::{metrics_selector_labels, owned_meta, METRICS_PASSWORD_VERSION_ANNOTATION};

/// Name of the exporter's container port
pub const METRICS_PORT_NAME: &str = "metrics";

const EXPORTER_CONTAINER: &str = "exporter";
const CONFIG_VOLUME: &str = "config";
const CONFIG_MOUNT_PATH: &str = "/etc/config/";

/// Build the mysqld exporter Deployment for a MariaDB.
///
/// Fails with a validation error when metrics are disabled.
pub fn build_exporter_deployment(mariadb: &MariaDB) -> Result<Deployment> {
    let metrics = mariadb
        .spec
        .metrics
        .as_ref()
        .filter(|m| m.enabled)
        .ok_or_else(|| metrics_disabled("MariaDB", mariadb))?;
    let config = mariadb.metrics_config_secret_key_ref();

    exporter_deployment(
        &mariadb.metrics_name(),
        mariadb,
        &metrics.exporter,
        vec![format!("--config.my-cnf={}", config_file(&config.key))],
        &mariadb.spec.image_pull_secrets,
        &config.name,
    )
}

/// Build the MaxScale exporter Deployment.
///
/// The Deployment is controlled by the MariaDB the MaxScale fronts, so it is
/// collected together with the database.
pub fn build_maxscale_exporter_deployment(maxscale: &MaxScale, mariadb: &MariaDB) -> Result<Deployment> {
    let metrics = maxscale
        .spec
        .metrics
        .as_ref()
        .filter(|m| m.enabled)
        .ok_or_else(|| metrics_disabled("MaxScale", maxscale))?;
    let config = maxscale.metrics_config_secret_key_ref();

    exporter_deployment(
        &maxscale.metrics_name(),
        mariadb,
        &metrics.exporter,
        vec![format!("--config={}", config_file(&config.key))],
        &maxscale.spec.image_pull_secrets,
        &config.name,
    )
}

/// Stamp the metrics password Secret's resourceVersion on the pod template.
pub fn with_password_version(mut deployment: Deployment, version: &str) -> Deployment {
    if let Some(spec) = deployment.spec.as_mut() {
        spec.template
            .metadata
            .get_or_insert_with(ObjectMeta::default)
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(
                METRICS_PASSWORD_VERSION_ANNOTATION.to_string(),
                version.to_string(),
            );
    }
    deployment
}

fn metrics_disabled<K: ResourceExt>(kind: &str, owner: &K) -> Error {
    Error::validation_for(
        format!("{}/{}", owner.namespace().unwrap_or_default(), owner.name_any()),
        format!("{kind} instance does not specify metrics"),
    )
}

fn config_file(key: &str) -> String {
    format!("{CONFIG_MOUNT_PATH}{key}")
}

fn exporter_deployment(
    name: &str,
    owner: &MariaDB,
    exporter: &Exporter,
    args: Vec<String>,
    owner_pull_secrets: &[LocalObjectReference],
    config_secret: &str,
) -> Result<Deployment> {
    let selector = metrics_selector_labels(name);
    let pod_meta = ObjectMeta {
        labels: Some(selector.clone()),
        ..Default::default()
    };

    Ok(Deployment {
        metadata: owned_meta(name, owner)?,
        spec: Some(DeploymentSpec {
            selector: LabelSelector {
                match_labels: Some(selector),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(pod_meta),
                spec: Some(PodSpec {
                    containers: vec![exporter_container(exporter, args)],
                    image_pull_secrets: merge_pull_secrets(
                        owner_pull_secrets,
                        &exporter.image_pull_secrets,
                    ),
                    volumes: Some(vec![Volume {
                        name: CONFIG_VOLUME.to_string(),
                        secret: Some(SecretVolumeSource {
                            secret_name: Some(config_secret.to_string()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    node_selector: exporter.node_selector.clone(),
                    priority_class_name: exporter
                        .priority_class_name
                        .clone()
                        .filter(|p| !p.is_empty()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn exporter_container(exporter: &Exporter, mut args: Vec<String>) -> Container {
    args.extend(exporter.args.iter().cloned());
    let probe = Probe {
        http_get: Some(HTTPGetAction {
            path: Some("/".to_string()),
            port: IntOrString::Int(exporter.port),
            ..Default::default()
        }),
        ..Default::default()
    };

    Container {
        name: EXPORTER_CONTAINER.to_string(),
        image: Some(exporter.image.clone()),
        image_pull_policy: exporter.image_pull_policy.clone(),
        args: Some(args),
        ports: Some(vec![ContainerPort {
            name: Some(METRICS_PORT_NAME.to_string()),
            container_port: exporter.port,
            ..Default::default()
        }]),
        volume_mounts: Some(vec![VolumeMount {
            name: CONFIG_VOLUME.to_string(),
            mount_path: CONFIG_MOUNT_PATH.to_string(),
            read_only: Some(true),
            ..Default::default()
        }]),
        liveness_probe: Some(probe.clone()),
        readiness_probe: Some(probe),
        ..Default::default()
    }
}

/// Union of both pull secret lists, first occurrence wins
fn merge_pull_secrets(
    first: &[LocalObjectReference],
    second: &[LocalObjectReference],
) -> Option<Vec<PullSecretRef>> {
    let mut merged: Vec<PullSecretRef> = Vec::new();
    for reference in first.iter().chain(second) {
        if !merged.iter().any(|r| r.name == reference.name) {
            merged.push(PullSecretRef {
                name: reference.name.clone(),
            });
        }
    }
    (!merged.is_empty()).then_some(merged)
}
