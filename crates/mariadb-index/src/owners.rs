//! Extractors for the owner kinds the operator indexes

use std::sync::OnceLock;

use mariadb_common::crd::{LocalObjectReference, MariaDB, MaxScale, Tls};
use mariadb_common::field_paths::{
    MARIADB_METRICS_PASSWORD_SECRET, MARIADB_MY_CNF_CONFIG_MAP, MARIADB_TLS_CLIENT_CA_SECRET,
    MARIADB_TLS_CLIENT_CERT_SECRET, MARIADB_TLS_SERVER_CA_SECRET, MARIADB_TLS_SERVER_CERT_SECRET,
    MAXSCALE_METRICS_PASSWORD_SECRET,
};

use crate::registry::{IndexRegistry, Indexed};

impl Indexed for MariaDB {
    fn index_registry() -> &'static IndexRegistry<Self> {
        static REGISTRY: OnceLock<IndexRegistry<MariaDB>> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            IndexRegistry::new("MariaDB")
                .with(MARIADB_MY_CNF_CONFIG_MAP, my_cnf_config_map)
                .with(MARIADB_METRICS_PASSWORD_SECRET, metrics_password_secret)
                .with(MARIADB_TLS_SERVER_CA_SECRET, tls_server_ca_secret)
                .with(MARIADB_TLS_SERVER_CERT_SECRET, tls_server_cert_secret)
                .with(MARIADB_TLS_CLIENT_CA_SECRET, tls_client_ca_secret)
                .with(MARIADB_TLS_CLIENT_CERT_SECRET, tls_client_cert_secret)
        })
    }
}

impl Indexed for MaxScale {
    fn index_registry() -> &'static IndexRegistry<Self> {
        static REGISTRY: OnceLock<IndexRegistry<MaxScale>> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            IndexRegistry::new("MaxScale")
                .with(MAXSCALE_METRICS_PASSWORD_SECRET, maxscale_metrics_password_secret)
        })
    }
}

fn non_empty(name: Option<&str>) -> Vec<String> {
    match name {
        Some(name) if !name.is_empty() => vec![name.to_string()],
        _ => Vec::new(),
    }
}

fn my_cnf_config_map(mariadb: &MariaDB) -> Vec<String> {
    non_empty(
        mariadb
            .spec
            .my_cnf_config_map_key_ref
            .as_ref()
            .map(|r| r.local_object_reference.name.as_str()),
    )
}

// The metrics block keeps a populated default password ref while disabled.
fn metrics_password_secret(mariadb: &MariaDB) -> Vec<String> {
    if !mariadb.are_metrics_enabled() {
        return Vec::new();
    }
    non_empty(
        mariadb
            .spec
            .metrics
            .as_ref()
            .map(|m| m.password_secret_key_ref.name.as_str()),
    )
}

fn tls_secret(mariadb: &MariaDB, select: fn(&Tls) -> Option<&LocalObjectReference>) -> Vec<String> {
    if !mariadb.is_tls_enabled() {
        return Vec::new();
    }
    non_empty(
        mariadb
            .spec
            .tls
            .as_ref()
            .and_then(select)
            .map(|r| r.name.as_str()),
    )
}

fn tls_server_ca_secret(mariadb: &MariaDB) -> Vec<String> {
    tls_secret(mariadb, |tls| tls.server_ca_secret_ref.as_ref())
}

fn tls_server_cert_secret(mariadb: &MariaDB) -> Vec<String> {
    tls_secret(mariadb, |tls| tls.server_cert_secret_ref.as_ref())
}

fn tls_client_ca_secret(mariadb: &MariaDB) -> Vec<String> {
    tls_secret(mariadb, |tls| tls.client_ca_secret_ref.as_ref())
}

fn tls_client_cert_secret(mariadb: &MariaDB) -> Vec<String> {
    tls_secret(mariadb, |tls| tls.client_cert_secret_ref.as_ref())
}

fn maxscale_metrics_password_secret(maxscale: &MaxScale) -> Vec<String> {
    if !maxscale.are_metrics_enabled() {
        return Vec::new();
    }
    non_empty(Some(
        maxscale
            .spec
            .auth
            .metrics_password_secret_key_ref
            .name
            .as_str(),
    ))
}
