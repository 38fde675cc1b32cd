//! Startup bindings for each indexed owner kind

use mariadb_common::crd::{MariaDB, MaxScale};
use mariadb_common::field_paths::{
    MARIADB_METRICS_PASSWORD_SECRET, MARIADB_MY_CNF_CONFIG_MAP, MARIADB_TLS_CLIENT_CA_SECRET,
    MARIADB_TLS_CLIENT_CERT_SECRET, MARIADB_TLS_SERVER_CA_SECRET, MARIADB_TLS_SERVER_CERT_SECRET,
    MAXSCALE_METRICS_PASSWORD_SECRET,
};
use mariadb_common::Result;

use crate::binder::WatchBinder;
use crate::predicate::LabelPredicate;
use crate::registrar::WatchRegistrar;
use crate::registry::WatchedKind;

/// Bind the ConfigMaps and Secrets a MariaDB references.
///
/// Errors are fatal: the caller must abort startup.
pub async fn index_mariadb(registrar: &dyn WatchRegistrar) -> Result<WatchBinder<MariaDB>> {
    let predicate = LabelPredicate::watch_enabled();
    WatchBinder::builder()
        .bind(
            WatchedKind::ConfigMap,
            MARIADB_MY_CNF_CONFIG_MAP,
            predicate.clone(),
        )
        .bind(
            WatchedKind::Secret,
            MARIADB_METRICS_PASSWORD_SECRET,
            predicate.clone(),
        )
        .bind(
            WatchedKind::Secret,
            MARIADB_TLS_SERVER_CA_SECRET,
            predicate.clone(),
        )
        .bind(
            WatchedKind::Secret,
            MARIADB_TLS_SERVER_CERT_SECRET,
            predicate.clone(),
        )
        .bind(
            WatchedKind::Secret,
            MARIADB_TLS_CLIENT_CA_SECRET,
            predicate.clone(),
        )
        .bind(WatchedKind::Secret, MARIADB_TLS_CLIENT_CERT_SECRET, predicate)
        .build(registrar)
        .await
}

/// Bind the Secrets a MaxScale references.
pub async fn index_maxscale(registrar: &dyn WatchRegistrar) -> Result<WatchBinder<MaxScale>> {
    WatchBinder::builder()
        .bind(
            WatchedKind::Secret,
            MAXSCALE_METRICS_PASSWORD_SECRET,
            LabelPredicate::watch_enabled(),
        )
        .build(registrar)
        .await
}
