//! Kubernetes operations the Grant controller needs

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};

#[cfg(test)]
use mockall::automock;

use mariadb_common::crd::{Grant, GrantStatus, User};
use mariadb_common::{Error, Result, FIELD_MANAGER};

/// Trait abstracting Kubernetes client operations for Grants
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GrantKubeClient: Send + Sync {
    /// Whether the User resource `namespace/name` exists
    async fn user_exists(&self, namespace: &str, name: &str) -> Result<bool>;

    /// Replace the Grant's finalizer list.
    ///
    /// The patch carries the Grant's `resourceVersion`; if the object changed
    /// since it was read the API server rejects it and this returns
    /// `PatchConflict`.
    async fn patch_finalizers(&self, grant: &Grant, finalizers: Vec<String>) -> Result<()>;

    /// Merge-patch the Grant's status
    async fn patch_status(&self, grant: &Grant, status: &GrantStatus) -> Result<()>;
}

/// Real Kubernetes client implementation
pub struct GrantKubeClientImpl {
    client: Client,
}

impl GrantKubeClientImpl {
    /// Create a new GrantKubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn grants(&self, grant: &Grant) -> Api<Grant> {
        Api::namespaced(
            self.client.clone(),
            &grant.namespace().unwrap_or_default(),
        )
    }
}

#[async_trait]
impl GrantKubeClient for GrantKubeClientImpl {
    async fn user_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        let users: Api<User> = Api::namespaced(self.client.clone(), namespace);
        Ok(users.get_opt(name).await?.is_some())
    }

    async fn patch_finalizers(&self, grant: &Grant, finalizers: Vec<String>) -> Result<()> {
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": grant.resource_version(),
                "finalizers": finalizers,
            }
        });
        self.grants(grant)
            .patch(
                &grant.name_any(),
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| Error::from_patch(e, "Grant", grant.key()))?;
        Ok(())
    }

    async fn patch_status(&self, grant: &Grant, status: &GrantStatus) -> Result<()> {
        let patch = serde_json::json!({ "status": status });
        self.grants(grant)
            .patch_status(
                &grant.name_any(),
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await?;
        Ok(())
    }
}
