//! Watch bindings from referenced ConfigMaps/Secrets to owners
//!
//! A [`WatchBinder`] only exists once every binding has registered. Setup is
//! all-or-nothing: the builder resolves every token before registering
//! anything, registers in declaration order, and returns no binder at all on
//! the first failure, so no partial watch set is ever attached to a controller.

use std::fmt::Debug;
use std::sync::Arc;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::runtime::watcher;
use kube::runtime::Controller;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use mariadb_common::Result;

use crate::predicate::LabelPredicate;
use crate::registrar::{WatchRegistrar, WatchRequest};
use crate::registry::{Extractor, Indexed, WatchedKind};

/// Watcher timeout (seconds), kept under the client read timeout
const WATCH_TIMEOUT_SECS: u32 = 25;

/// A registered binding between a watched kind and owner kind `K`.
pub struct WatchBinding<K> {
    /// Kind whose changes trigger reconciliation
    pub watched: WatchedKind,
    /// Field-path token the binding was made through
    pub token: String,
    /// Label filter applied to watched objects
    pub predicate: LabelPredicate,
    extract: Extractor<K>,
}

impl<K> WatchBinding<K> {
    /// Whether `owner` references a watched object named `name`
    pub fn references(&self, owner: &K, name: &str) -> bool {
        (self.extract)(owner).iter().any(|n| n == name)
    }
}

impl<K> Debug for WatchBinding<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchBinding")
            .field("watched", &self.watched)
            .field("token", &self.token)
            .field("predicate", &self.predicate)
            .finish()
    }
}

/// Stages bindings for owner kind `K`.
pub struct WatchBinderBuilder<K> {
    pending: Vec<(WatchedKind, String, LabelPredicate)>,
    _owner: std::marker::PhantomData<fn() -> K>,
}

impl<K: Indexed> WatchBinderBuilder<K> {
    /// Stage a binding of `watched` to `K` through `token`
    pub fn bind(
        mut self,
        watched: WatchedKind,
        token: impl Into<String>,
        predicate: LabelPredicate,
    ) -> Self {
        self.pending.push((watched, token.into(), predicate));
        self
    }

    /// Resolve and register every staged binding.
    ///
    /// Fails with `UnsupportedFieldPath` before registering anything if a
    /// token has no extractor, and with `WatchRegistration` naming the token
    /// if the registrar rejects one. Either way nothing is bound.
    pub async fn build(self, registrar: &dyn WatchRegistrar) -> Result<WatchBinder<K>> {
        let registry = K::index_registry();
        let owner_kind = registry.owner_kind();

        let mut bindings = Vec::with_capacity(self.pending.len());
        for (watched, token, predicate) in self.pending {
            let extract = registry.extractor_for(&token)?;
            bindings.push(WatchBinding {
                watched,
                token,
                predicate,
                extract,
            });
        }

        for binding in &bindings {
            let request = WatchRequest {
                watched: binding.watched,
                owner_kind: owner_kind.to_string(),
                token: binding.token.clone(),
                predicate: binding.predicate.clone(),
            };
            registrar.register(&request).await?;
        }

        info!(
            owner = owner_kind,
            bindings = bindings.len(),
            "Watch bindings established"
        );
        Ok(WatchBinder { bindings })
    }
}

/// The fixed set of watch bindings for owner kind `K`.
#[derive(Debug)]
pub struct WatchBinder<K> {
    bindings: Vec<WatchBinding<K>>,
}

impl<K: Indexed> WatchBinder<K> {
    /// Start staging bindings
    pub fn builder() -> WatchBinderBuilder<K> {
        WatchBinderBuilder {
            pending: Vec::new(),
            _owner: std::marker::PhantomData,
        }
    }

    /// Established bindings, in registration order
    pub fn bindings(&self) -> &[WatchBinding<K>] {
        &self.bindings
    }

    /// Owners to reconcile after an event on a watched object.
    ///
    /// Only bindings for `watched` whose predicate admits the object count.
    /// Owners match within the object's namespace when any such binding's
    /// extractor returns the object's name; each owner is returned once.
    pub fn owners_for(
        &self,
        owners: &[Arc<K>],
        watched: WatchedKind,
        meta: &ObjectMeta,
    ) -> Vec<ObjectRef<K>> {
        let Some(name) = meta.name.as_deref() else {
            return Vec::new();
        };
        let namespace = meta.namespace.as_deref();

        let active: Vec<&WatchBinding<K>> = self
            .bindings
            .iter()
            .filter(|b| b.watched == watched && b.predicate.matches(meta))
            .collect();
        if active.is_empty() {
            return Vec::new();
        }

        owners
            .iter()
            .filter(|owner| owner.namespace().as_deref() == namespace)
            .filter(|owner| active.iter().any(|b| b.references(owner, name)))
            .map(|owner| ObjectRef::from_obj(owner.as_ref()))
            .collect()
    }

    /// Attach one watch per watched kind to `controller`.
    ///
    /// Owners are looked up in the controller's own reflector store, so the
    /// extraction always runs against the current spec.
    pub fn attach(
        self,
        controller: Controller<K>,
        client: &Client,
        namespace: Option<&str>,
    ) -> Controller<K> {
        let store = controller.store();
        let binder = Arc::new(self);
        let mut controller = controller;

        if binder.has_kind(WatchedKind::ConfigMap) {
            controller = watch_kind::<K, ConfigMap>(
                controller,
                api_for(client, namespace),
                binder.watcher_config(WatchedKind::ConfigMap),
                WatchedKind::ConfigMap,
                binder.clone(),
                store.clone(),
            );
        }
        if binder.has_kind(WatchedKind::Secret) {
            controller = watch_kind::<K, Secret>(
                controller,
                api_for(client, namespace),
                binder.watcher_config(WatchedKind::Secret),
                WatchedKind::Secret,
                binder.clone(),
                store,
            );
        }
        controller
    }

    fn has_kind(&self, watched: WatchedKind) -> bool {
        self.bindings.iter().any(|b| b.watched == watched)
    }

    // A server-side selector is only safe when every binding of the kind
    // uses the same predicate; otherwise filtering happens in the mapper.
    fn watcher_config(&self, watched: WatchedKind) -> watcher::Config {
        let mut predicates = self
            .bindings
            .iter()
            .filter(|b| b.watched == watched)
            .map(|b| &b.predicate);
        let config = watcher::Config::default().timeout(WATCH_TIMEOUT_SECS);
        match predicates.next() {
            Some(first) if predicates.all(|p| p == first) => config.labels(first.selector()),
            _ => config,
        }
    }
}

fn api_for<W>(client: &Client, namespace: Option<&str>) -> Api<W>
where
    W: Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

fn watch_kind<K, W>(
    controller: Controller<K>,
    api: Api<W>,
    config: watcher::Config,
    watched: WatchedKind,
    binder: Arc<WatchBinder<K>>,
    store: Store<K>,
) -> Controller<K>
where
    K: Indexed,
    W: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    controller.watches(api, config, move |obj: W| {
        let owners = binder.owners_for(&store.state(), watched, obj.meta());
        if !owners.is_empty() {
            debug!(
                watched = %watched,
                name = %obj.name_any(),
                owners = owners.len(),
                "Referenced object changed, enqueuing owners"
            );
        }
        owners
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use mariadb_common::crd::{
        LocalObjectReference, MariaDB, MariaDbMetrics, MariaDbSpec, SecretKeySelector, Tls,
    };
    use mariadb_common::field_paths::{
        MARIADB_METRICS_PASSWORD_SECRET, MARIADB_MY_CNF_CONFIG_MAP, MARIADB_TLS_SERVER_CA_SECRET,
    };
    use mariadb_common::{Error, WATCH_LABEL};

    use crate::registrar::{MockWatchRegistrar, RecordingRegistrar};

    fn sample_mariadb(name: &str, namespace: &str, metrics_secret: &str) -> Arc<MariaDB> {
        let mut mariadb = MariaDB::new(
            name,
            MariaDbSpec {
                image: "mariadb:11.4".into(),
                port: 3306,
                root_password_secret_key_ref: SecretKeySelector {
                    name: "root".into(),
                    key: "password".into(),
                },
                my_cnf_config_map_key_ref: None,
                metrics: Some(MariaDbMetrics {
                    enabled: true,
                    password_secret_key_ref: SecretKeySelector {
                        name: metrics_secret.into(),
                        key: "password".into(),
                    },
                    ..Default::default()
                }),
                tls: Some(Tls {
                    enabled: true,
                    server_ca_secret_ref: Some(LocalObjectReference::new("ca")),
                    ..Default::default()
                }),
                image_pull_secrets: vec![],
            },
        );
        mariadb.metadata.namespace = Some(namespace.into());
        Arc::new(mariadb)
    }

    fn watched_meta(name: &str, namespace: &str, labeled: bool) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            labels: labeled.then(|| BTreeMap::from([(WATCH_LABEL.to_string(), "".to_string())])),
            ..Default::default()
        }
    }

    async fn secret_binder() -> WatchBinder<MariaDB> {
        WatchBinder::<MariaDB>::builder()
            .bind(
                WatchedKind::Secret,
                MARIADB_METRICS_PASSWORD_SECRET,
                LabelPredicate::watch_enabled(),
            )
            .bind(
                WatchedKind::Secret,
                MARIADB_TLS_SERVER_CA_SECRET,
                LabelPredicate::watch_enabled(),
            )
            .build(&RecordingRegistrar::new())
            .await
            .unwrap()
    }

    mod build {
        use super::*;

        #[tokio::test]
        async fn registers_in_declaration_order() {
            let registrar = RecordingRegistrar::new();
            let binder = WatchBinder::<MariaDB>::builder()
                .bind(
                    WatchedKind::ConfigMap,
                    MARIADB_MY_CNF_CONFIG_MAP,
                    LabelPredicate::watch_enabled(),
                )
                .bind(
                    WatchedKind::Secret,
                    MARIADB_METRICS_PASSWORD_SECRET,
                    LabelPredicate::watch_enabled(),
                )
                .build(&registrar)
                .await
                .unwrap();

            let tokens: Vec<_> = registrar.requests().into_iter().map(|r| r.token).collect();
            assert_eq!(
                tokens,
                vec![MARIADB_MY_CNF_CONFIG_MAP, MARIADB_METRICS_PASSWORD_SECRET]
            );
            assert_eq!(binder.bindings().len(), 2);
            assert!(registrar.requests().iter().all(|r| r.owner_kind == "MariaDB"));
        }

        #[tokio::test]
        async fn unsupported_token_fails_before_any_registration() {
            let mut registrar = MockWatchRegistrar::new();
            registrar.expect_register().never();

            let result = WatchBinder::<MariaDB>::builder()
                .bind(
                    WatchedKind::Secret,
                    MARIADB_METRICS_PASSWORD_SECRET,
                    LabelPredicate::watch_enabled(),
                )
                .bind(
                    WatchedKind::Secret,
                    ".spec.galera.sst",
                    LabelPredicate::watch_enabled(),
                )
                .build(&registrar)
                .await;

            match result {
                Err(Error::UnsupportedFieldPath { token, .. }) => {
                    assert_eq!(token, ".spec.galera.sst")
                }
                other => panic!("expected UnsupportedFieldPath, got {:?}", other.err()),
            }
        }

        #[tokio::test]
        async fn registration_failure_stops_at_failing_token() {
            let mut registrar = MockWatchRegistrar::new();
            let mut seq = mockall::Sequence::new();
            registrar
                .expect_register()
                .withf(|r| r.token == MARIADB_MY_CNF_CONFIG_MAP)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
            registrar
                .expect_register()
                .withf(|r| r.token == MARIADB_METRICS_PASSWORD_SECRET)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|r| Err(r.error("forbidden")));

            let result = WatchBinder::<MariaDB>::builder()
                .bind(
                    WatchedKind::ConfigMap,
                    MARIADB_MY_CNF_CONFIG_MAP,
                    LabelPredicate::watch_enabled(),
                )
                .bind(
                    WatchedKind::Secret,
                    MARIADB_METRICS_PASSWORD_SECRET,
                    LabelPredicate::watch_enabled(),
                )
                .bind(
                    WatchedKind::Secret,
                    MARIADB_TLS_SERVER_CA_SECRET,
                    LabelPredicate::watch_enabled(),
                )
                .build(&registrar)
                .await;

            let err = result.err().unwrap();
            assert!(err.to_string().contains(MARIADB_METRICS_PASSWORD_SECRET));
            assert!(!err.is_retryable());
        }
    }

    mod owners_for {
        use super::*;

        #[tokio::test]
        async fn matches_owner_referencing_the_secret() {
            let binder = secret_binder().await;
            let owners = vec![
                sample_mariadb("a", "db", "metrics-a"),
                sample_mariadb("b", "db", "metrics-b"),
            ];
            let refs = binder.owners_for(
                &owners,
                WatchedKind::Secret,
                &watched_meta("metrics-b", "db", true),
            );
            assert_eq!(refs, vec![ObjectRef::new("b").within("db")]);
        }

        #[tokio::test]
        async fn every_referencing_owner_is_enqueued_once() {
            let binder = secret_binder().await;
            let owners = vec![
                sample_mariadb("a", "db", "metrics-a"),
                sample_mariadb("b", "db", "metrics-b"),
            ];
            // Both owners reference "ca" through TLS; neither is duplicated.
            let refs =
                binder.owners_for(&owners, WatchedKind::Secret, &watched_meta("ca", "db", true));
            assert_eq!(
                refs,
                vec![ObjectRef::new("a").within("db"), ObjectRef::new("b").within("db")]
            );
        }

        #[tokio::test]
        async fn unlabeled_objects_trigger_nothing() {
            let binder = secret_binder().await;
            let owners = vec![sample_mariadb("a", "db", "metrics-a")];
            let refs = binder.owners_for(
                &owners,
                WatchedKind::Secret,
                &watched_meta("metrics-a", "db", false),
            );
            assert!(refs.is_empty());
        }

        #[tokio::test]
        async fn owners_in_other_namespaces_do_not_match() {
            let binder = secret_binder().await;
            let owners = vec![sample_mariadb("a", "other", "metrics-a")];
            let refs = binder.owners_for(
                &owners,
                WatchedKind::Secret,
                &watched_meta("metrics-a", "db", true),
            );
            assert!(refs.is_empty());
        }

        #[tokio::test]
        async fn unbound_kind_triggers_nothing() {
            let binder = secret_binder().await;
            let owners = vec![sample_mariadb("a", "db", "metrics-a")];
            let refs = binder.owners_for(
                &owners,
                WatchedKind::ConfigMap,
                &watched_meta("metrics-a", "db", true),
            );
            assert!(refs.is_empty());
        }

        #[tokio::test]
        async fn disabled_metrics_stop_matching() {
            let binder = secret_binder().await;
            let mut owner = (*sample_mariadb("a", "db", "metrics-a")).clone();
            if let Some(metrics) = owner.spec.metrics.as_mut() {
                metrics.enabled = false;
            }
            let refs = binder.owners_for(
                &[Arc::new(owner)],
                WatchedKind::Secret,
                &watched_meta("metrics-a", "db", true),
            );
            assert!(refs.is_empty());
        }
    }

    #[tokio::test]
    async fn shared_predicate_becomes_server_side_selector() {
        let binder = secret_binder().await;
        let config = binder.watcher_config(WatchedKind::Secret);
        assert_eq!(config.label_selector.as_deref(), Some(WATCH_LABEL));
    }
}
