//! Controller runner - builds controller futures for each owner kind
//!
//! Each `build_*` function returns a boxed future that the caller composes.
//! Namespace scoping applies to the primary watch, owned Deployments and the
//! ConfigMap/Secret watches the binders add.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::NamespaceResourceScope;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use mariadb_common::crd::{Grant, MariaDB, MaxScale};
use mariadb_grant::Context as GrantContext;
use mariadb_index::WatchBinder;

use crate::config::OperatorConfig;
use crate::controller::{mariadb, maxscale, ExporterContext};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Boxed controller future
pub type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Build the MariaDB exporter controller
pub fn build_mariadb_controller(
    client: Client,
    config: &OperatorConfig,
    binder: WatchBinder<MariaDB>,
) -> ControllerFuture {
    let namespace = config.namespace.as_deref();
    let ctx = Arc::new(ExporterContext::new(client.clone(), "mariadb-controller"));

    tracing::info!("- MariaDB controller");

    let controller = Controller::new(api_for::<MariaDB>(&client, namespace), watcher_config())
        .owns(api_for::<Deployment>(&client, namespace), watcher_config());
    Box::pin(
        binder
            .attach(controller, &client, namespace)
            .shutdown_on_signal()
            .run(mariadb::reconcile, mariadb::error_policy, ctx)
            .for_each(log_reconcile_result("MariaDB")),
    )
}

/// Build the MaxScale exporter controller
pub fn build_maxscale_controller(
    client: Client,
    config: &OperatorConfig,
    binder: WatchBinder<MaxScale>,
) -> ControllerFuture {
    let namespace = config.namespace.as_deref();
    let ctx = Arc::new(ExporterContext::new(client.clone(), "maxscale-controller"));

    tracing::info!("- MaxScale controller");

    let controller = Controller::new(api_for::<MaxScale>(&client, namespace), watcher_config());
    Box::pin(
        binder
            .attach(controller, &client, namespace)
            .shutdown_on_signal()
            .run(maxscale::reconcile, maxscale::error_policy, ctx)
            .for_each(log_reconcile_result("MaxScale")),
    )
}

/// Build the Grant controller.
///
/// `shutdown` aborts in-flight finalizer polls; the controller itself stops
/// on the same signal through `shutdown_on_signal`.
pub fn build_grant_controller(
    client: Client,
    config: &OperatorConfig,
    shutdown: CancellationToken,
) -> ControllerFuture {
    let ctx = Arc::new(
        GrantContext::builder(client.clone())
            .poll_config(config.poll)
            .cancellation(shutdown)
            .build(),
    );

    tracing::info!(
        interval_ms = config.poll.interval.as_millis() as u64,
        timeout_ms = config.poll.timeout.as_millis() as u64,
        "- Grant controller"
    );

    Box::pin(
        Controller::new(
            api_for::<Grant>(&client, config.namespace.as_deref()),
            watcher_config(),
        )
        .shutdown_on_signal()
        .run(mariadb_grant::reconcile, mariadb_grant::error_policy, ctx)
        .for_each(log_reconcile_result("Grant")),
    )
}

fn watcher_config() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

fn api_for<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + std::fmt::Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Creates a closure for logging reconciliation results.
fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
