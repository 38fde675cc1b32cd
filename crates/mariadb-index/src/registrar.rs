//! Watch registration against the API server
//!
//! Registration runs once per binding at startup. The kube implementation
//! proves the operator can list the watched kind with the binding's label
//! selector; a controller that cannot observe its references must not start.

#[cfg(any(test, feature = "testing"))]
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use mariadb_common::{Error, Result};

use crate::predicate::LabelPredicate;
use crate::registry::WatchedKind;

/// One binding as seen by the platform: which kind to watch, for which owner,
/// through which token and filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchRequest {
    /// Kind whose changes trigger reconciliation
    pub watched: WatchedKind,
    /// Kind that gets reconciled
    pub owner_kind: String,
    /// Field-path token linking the two
    pub token: String,
    /// Label filter applied to watched objects
    pub predicate: LabelPredicate,
}

impl WatchRequest {
    /// Build a `WatchRegistration` error for this request
    pub fn error(&self, msg: impl Into<String>) -> Error {
        Error::watch_registration(
            self.token.clone(),
            self.watched.as_str(),
            self.owner_kind.clone(),
            msg,
        )
    }
}

/// Registers watches with the orchestration platform.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WatchRegistrar: Send + Sync {
    /// Register one binding. Errors must be `WatchRegistration` naming the token.
    async fn register(&self, request: &WatchRequest) -> Result<()>;
}

/// Registrar backed by the Kubernetes API.
pub struct KubeWatchRegistrar {
    client: Client,
    namespace: Option<String>,
}

impl KubeWatchRegistrar {
    /// Create a registrar; `namespace` restricts watches to one namespace
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    async fn probe<K>(&self, request: &WatchRequest) -> Result<()>
    where
        K: kube::Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + serde::de::DeserializeOwned
            + std::fmt::Debug,
    {
        let api: Api<K> = match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let params = ListParams::default()
            .labels(request.predicate.selector())
            .limit(1);
        api.list_metadata(&params)
            .await
            .map_err(|e| request.error(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl WatchRegistrar for KubeWatchRegistrar {
    async fn register(&self, request: &WatchRequest) -> Result<()> {
        match request.watched {
            WatchedKind::ConfigMap => self.probe::<ConfigMap>(request).await?,
            WatchedKind::Secret => self.probe::<Secret>(request).await?,
        }
        debug!(
            token = %request.token,
            watched = %request.watched,
            owner = %request.owner_kind,
            "Watch registered"
        );
        Ok(())
    }
}

/// In-memory registrar that records every request, optionally failing one
/// token.
#[cfg(any(test, feature = "testing"))]
#[derive(Default)]
pub struct RecordingRegistrar {
    fail_on: Option<String>,
    requests: Mutex<Vec<WatchRequest>>,
}

#[cfg(any(test, feature = "testing"))]
impl RecordingRegistrar {
    /// Registrar that accepts every request
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrar that rejects the request for `token`
    pub fn failing_on(token: impl Into<String>) -> Self {
        Self {
            fail_on: Some(token.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<WatchRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl WatchRegistrar for RecordingRegistrar {
    async fn register(&self, request: &WatchRequest) -> Result<()> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if self.fail_on.as_deref() == Some(request.token.as_str()) {
            return Err(request.error("registration rejected"));
        }
        Ok(())
    }
}
