//! Kubernetes operations the exporter controllers need

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[cfg(test)]
use mockall::automock;

use mariadb_common::crd::MariaDB;
use mariadb_common::error::is_not_found;
use mariadb_common::{Result, FIELD_MANAGER};

/// Trait abstracting Kubernetes client operations for exporter resources
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExporterKubeClient: Send + Sync {
    /// Get a Secret, `None` if it does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    /// Get a MariaDB, `None` if it does not exist
    async fn get_mariadb(&self, namespace: &str, name: &str) -> Result<Option<MariaDB>>;

    /// Server-side apply a Secret
    async fn apply_secret(&self, secret: &Secret) -> Result<()>;

    /// Server-side apply a Deployment
    async fn apply_deployment(&self, deployment: &Deployment) -> Result<()>;

    /// Delete a Deployment; returns whether it existed
    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<bool>;

    /// Delete a Secret; returns whether it existed
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<bool>;
}

/// Real Kubernetes client implementation
pub struct ExporterKubeClientImpl {
    client: Client,
}

impl ExporterKubeClientImpl {
    /// Create a new ExporterKubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn apply<K>(&self, obj: &K) -> Result<()>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Serialize
            + std::fmt::Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), &obj.namespace().unwrap_or_default());
        api.patch(
            &obj.name_any(),
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(obj),
        )
        .await?;
        Ok(())
    }

    async fn delete<K>(&self, namespace: &str, name: &str) -> Result<bool>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::background()).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ExporterKubeClient for ExporterKubeClientImpl {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_mariadb(&self, namespace: &str, name: &str) -> Result<Option<MariaDB>> {
        let api: Api<MariaDB> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn apply_secret(&self, secret: &Secret) -> Result<()> {
        self.apply(secret).await
    }

    async fn apply_deployment(&self, deployment: &Deployment) -> Result<()> {
        self.apply(deployment).await
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<bool> {
        self.delete::<Deployment>(namespace, name).await
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<bool> {
        self.delete::<Secret>(namespace, name).await
    }
}
