//! MaxScale exporter reconciliation

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, instrument};

use mariadb_builder::{
    build_maxscale_exporter_config_secret, build_maxscale_exporter_deployment,
    with_password_version,
};
use mariadb_common::crd::MaxScale;
use mariadb_common::{default_error_policy, Error, Result};

use super::{read_password, remove_exporter, ExporterContext, RESYNC_INTERVAL};

/// Reconcile a MaxScale's metrics exporter.
///
/// The exporter Deployment is owned by the MariaDB the MaxScale points at, so
/// that MariaDB must exist before anything is applied.
#[instrument(skip(maxscale, ctx), fields(maxscale = %maxscale.name_any()))]
pub async fn reconcile(maxscale: Arc<MaxScale>, ctx: Arc<ExporterContext>) -> Result<Action> {
    let namespace = maxscale.namespace().unwrap_or_default();
    let key = format!("{namespace}/{}", maxscale.name_any());

    if !maxscale.are_metrics_enabled() {
        remove_exporter(
            maxscale.as_ref(),
            &ctx,
            &maxscale.metrics_name(),
            &maxscale.metrics_config_secret_key_ref().name,
        )
        .await?;
        return Ok(Action::await_change());
    }

    let mariadb_ref = &maxscale.spec.mariadb_ref;
    let mariadb_ns = mariadb_ref.namespace_or(&namespace);
    let mariadb = ctx
        .kube
        .get_mariadb(mariadb_ns, &mariadb_ref.name)
        .await?
        .ok_or_else(|| {
            Error::dependency_not_found(&key, "MariaDB", format!("{mariadb_ns}/{}", mariadb_ref.name))
        })?;

    let password = read_password(
        &ctx,
        &key,
        &namespace,
        &maxscale.spec.auth.metrics_password_secret_key_ref,
    )
    .await?;
    let config = build_maxscale_exporter_config_secret(&maxscale, &password.value)?;
    ctx.kube.apply_secret(&config).await?;

    let deployment = with_password_version(
        build_maxscale_exporter_deployment(&maxscale, &mariadb)?,
        &password.version,
    );
    ctx.kube.apply_deployment(&deployment).await?;
    debug!(deployment = %maxscale.metrics_name(), mariadb = %mariadb_ref.name, "Exporter applied");

    Ok(Action::requeue(RESYNC_INTERVAL))
}

/// Error policy for the MaxScale controller
pub fn error_policy(maxscale: Arc<MaxScale>, error: &Error, ctx: Arc<ExporterContext>) -> Action {
    default_error_policy(maxscale, error, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::password_secret;
    use crate::controller::MockExporterKubeClient;
    use mariadb_common::crd::{
        MariaDB, MariaDbRef, MariaDbSpec, MaxScaleAuth, MaxScaleMetrics, MaxScaleSpec,
        SecretKeySelector,
    };

    fn sample_maxscale(metrics_enabled: bool, mariadb_namespace: Option<&str>) -> MaxScale {
        let mut maxscale = MaxScale::new(
            "maxscale",
            MaxScaleSpec {
                mariadb_ref: MariaDbRef {
                    name: "mariadb".into(),
                    namespace: mariadb_namespace.map(str::to_string),
                },
                admin_port: 8989,
                auth: MaxScaleAuth {
                    metrics_username: "metrics".into(),
                    metrics_password_secret_key_ref: SecretKeySelector {
                        name: "maxscale-metrics".into(),
                        key: "password".into(),
                    },
                },
                metrics: Some(MaxScaleMetrics {
                    enabled: metrics_enabled,
                    ..MaxScaleMetrics::default()
                }),
                image_pull_secrets: vec![],
            },
        );
        maxscale.metadata.namespace = Some("db".into());
        maxscale.metadata.uid = Some("uid-maxscale".into());
        maxscale
    }

    fn sample_mariadb(namespace: &str) -> MariaDB {
        let mut mariadb = MariaDB::new(
            "mariadb",
            MariaDbSpec {
                image: "mariadb:11.4".into(),
                port: 3306,
                root_password_secret_key_ref: SecretKeySelector {
                    name: "root".into(),
                    key: "password".into(),
                },
                my_cnf_config_map_key_ref: None,
                metrics: None,
                tls: None,
                image_pull_secrets: vec![],
            },
        );
        mariadb.metadata.namespace = Some(namespace.into());
        mariadb.metadata.uid = Some("uid-mariadb".into());
        mariadb
    }

    fn context(kube: MockExporterKubeClient) -> Arc<ExporterContext> {
        Arc::new(ExporterContext::for_testing(Arc::new(kube)))
    }

    #[tokio::test]
    async fn exporter_is_owned_by_the_referenced_mariadb() {
        let mut kube = MockExporterKubeClient::new();
        kube.expect_get_mariadb()
            .withf(|ns, name| format!("{ns}/{name}") == "db/mariadb")
            .times(1)
            .returning(|ns, _| Ok(Some(sample_mariadb(ns))));
        kube.expect_get_secret()
            .withf(|ns, name| format!("{ns}/{name}") == "db/maxscale-metrics")
            .returning(|_, name| Ok(Some(password_secret(name, b"pw"))));
        kube.expect_apply_secret()
            .withf(|secret| secret.metadata.name.as_deref() == Some("maxscale-metrics-config"))
            .times(1)
            .returning(|_| Ok(()));
        kube.expect_apply_deployment()
            .withf(|deployment| {
                deployment
                    .metadata
                    .owner_references
                    .as_ref()
                    .is_some_and(|refs| refs[0].uid == "uid-mariadb")
            })
            .times(1)
            .returning(|_| Ok(()));

        let action = reconcile(Arc::new(sample_maxscale(true, None)), context(kube))
            .await
            .unwrap();
        assert_eq!(action, Action::requeue(RESYNC_INTERVAL));
    }

    #[tokio::test]
    async fn mariadb_namespace_override_is_honored() {
        let mut kube = MockExporterKubeClient::new();
        kube.expect_get_mariadb()
            .withf(|ns, name| format!("{ns}/{name}") == "shared/mariadb")
            .times(1)
            .returning(|_, _| Ok(None));
        kube.expect_apply_deployment().never();

        let err = reconcile(Arc::new(sample_maxscale(true, Some("shared"))), context(kube))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DependencyNotFound { .. }));
        assert!(err.to_string().contains("shared/mariadb"));
    }

    #[tokio::test]
    async fn disabled_metrics_remove_exporter_without_lookups() {
        let mut kube = MockExporterKubeClient::new();
        kube.expect_get_mariadb().never();
        kube.expect_delete_deployment()
            .withf(|ns, name| format!("{ns}/{name}") == "db/maxscale-metrics")
            .times(1)
            .returning(|_, _| Ok(false));
        kube.expect_delete_secret()
            .withf(|ns, name| format!("{ns}/{name}") == "db/maxscale-metrics-config")
            .times(1)
            .returning(|_, _| Ok(false));

        let action = reconcile(Arc::new(sample_maxscale(false, None)), context(kube))
            .await
            .unwrap();
        assert_eq!(action, Action::await_change());
    }
}
