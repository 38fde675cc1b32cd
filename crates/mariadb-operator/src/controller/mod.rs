//! Metrics exporter controllers for MariaDB and MaxScale
//!
//! Both controllers converge the same pair of objects, a config Secret and an
//! exporter Deployment, and remove them again when metrics are switched off.

mod kube_client;
pub mod mariadb;
pub mod maxscale;

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::Secret;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use tracing::info;

use mariadb_common::crd::SecretKeySelector;
use mariadb_common::events::{actions, reasons, EventPublisher, KubeEventPublisher};
use mariadb_common::{Error, Result};

pub use kube_client::{ExporterKubeClient, ExporterKubeClientImpl};
#[cfg(test)]
pub use kube_client::MockExporterKubeClient;

/// Periodic resync of an applied exporter
const RESYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Shared context for the exporter controllers
pub struct ExporterContext {
    /// Kubernetes operations on Secrets, Deployments and MariaDBs
    pub kube: Arc<dyn ExporterKubeClient>,
    /// Event publisher
    pub events: Arc<dyn EventPublisher>,
}

impl ExporterContext {
    /// Create a context backed by the real API, reporting events as `controller_name`
    pub fn new(client: Client, controller_name: &str) -> Self {
        Self {
            kube: Arc::new(ExporterKubeClientImpl::new(client.clone())),
            events: Arc::new(KubeEventPublisher::new(client, controller_name)),
        }
    }

    /// Create a context for testing with a mock client
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn ExporterKubeClient>) -> Self {
        Self {
            kube,
            events: Arc::new(mariadb_common::events::NoopEventPublisher),
        }
    }
}

/// Metrics password and the resourceVersion of the Secret it came from
struct Password {
    value: String,
    version: String,
}

async fn read_password(
    ctx: &ExporterContext,
    owner: &str,
    namespace: &str,
    selector: &SecretKeySelector,
) -> Result<Password> {
    if selector.name.is_empty() {
        return Err(Error::validation_for(
            owner,
            "metrics password secret reference is empty",
        ));
    }
    let secret = ctx
        .kube
        .get_secret(namespace, &selector.name)
        .await?
        .ok_or_else(|| {
            Error::dependency_not_found(owner, "Secret", format!("{namespace}/{}", selector.name))
        })?;
    let value = secret_value(&secret, &selector.key).ok_or_else(|| {
        Error::validation_for(
            owner,
            format!("secret {} has no UTF-8 key {}", selector.name, selector.key),
        )
    })?;
    Ok(Password {
        value,
        version: secret.resource_version().unwrap_or_default(),
    })
}

fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    let bytes = secret.data.as_ref()?.get(key)?;
    String::from_utf8(bytes.0.clone()).ok()
}

/// Delete the exporter Deployment and its config Secret, tolerating absence
async fn remove_exporter<K>(
    owner: &K,
    ctx: &ExporterContext,
    deployment: &str,
    config_secret: &str,
) -> Result<()>
where
    K: Resource<DynamicType = ()>,
{
    let namespace = owner.namespace().unwrap_or_default();
    let removed_deployment = ctx.kube.delete_deployment(&namespace, deployment).await?;
    let removed_secret = ctx.kube.delete_secret(&namespace, config_secret).await?;
    if removed_deployment || removed_secret {
        info!(%deployment, "Metrics disabled, exporter removed");
        ctx.events
            .publish(
                &owner.object_ref(&()),
                EventType::Normal,
                reasons::EXPORTER_RECONCILED,
                actions::RECONCILE,
                Some(format!("Exporter {deployment} removed")),
            )
            .await;
    }
    Ok(())
}
