//! MariaDB exporter reconciliation

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, instrument};

use mariadb_builder::{build_exporter_config_secret, build_exporter_deployment, with_password_version};
use mariadb_common::crd::MariaDB;
use mariadb_common::{default_error_policy, Error, Result};

use super::{read_password, remove_exporter, ExporterContext, RESYNC_INTERVAL};

/// Reconcile a MariaDB's metrics exporter.
///
/// Enabled metrics apply the config Secret and the exporter Deployment.
/// Disabled metrics delete both, which is a no-op once they are gone.
#[instrument(skip(mariadb, ctx), fields(mariadb = %mariadb.name_any()))]
pub async fn reconcile(mariadb: Arc<MariaDB>, ctx: Arc<ExporterContext>) -> Result<Action> {
    let namespace = mariadb.namespace().unwrap_or_default();
    let key = format!("{namespace}/{}", mariadb.name_any());

    let Some(metrics) = mariadb.spec.metrics.as_ref().filter(|m| m.enabled) else {
        remove_exporter(
            mariadb.as_ref(),
            &ctx,
            &mariadb.metrics_name(),
            &mariadb.metrics_config_secret_key_ref().name,
        )
        .await?;
        return Ok(Action::await_change());
    };

    let password = read_password(&ctx, &key, &namespace, &metrics.password_secret_key_ref).await?;
    let config = build_exporter_config_secret(&mariadb, &password.value)?;
    ctx.kube.apply_secret(&config).await?;

    let deployment = with_password_version(build_exporter_deployment(&mariadb)?, &password.version);
    ctx.kube.apply_deployment(&deployment).await?;
    debug!(deployment = %mariadb.metrics_name(), "Exporter applied");

    Ok(Action::requeue(RESYNC_INTERVAL))
}

/// Error policy for the MariaDB controller
pub fn error_policy(mariadb: Arc<MariaDB>, error: &Error, ctx: Arc<ExporterContext>) -> Action {
    default_error_policy(mariadb, error, ctx)
}
