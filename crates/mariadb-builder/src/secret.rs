//! Exporter config Secrets
//!
//! The exporters authenticate through an ini-style file mounted from these
//! Secrets rather than through command-line flags, so the password never shows
//! up in the pod spec.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;

use mariadb_common::crd::{MariaDB, MaxScale};
use mariadb_common::Result;

use crate::labels::owned_meta;

/// Build the `[client]` config Secret the mysqld exporter reads.
pub fn build_exporter_config_secret(mariadb: &MariaDB, password: &str) -> Result<Secret> {
    let selector = mariadb.metrics_config_secret_key_ref();
    let username = mariadb
        .spec
        .metrics
        .as_ref()
        .map(|m| m.username.as_str())
        .unwrap_or_default();

    let contents = format!(
        "[client]\nuser = {username}\npassword = {password}\nhost = {host}\nport = {port}\n",
        host = mariadb.internal_host(),
        port = mariadb.spec.port,
    );

    Ok(Secret {
        metadata: owned_meta(&selector.name, mariadb)?,
        string_data: Some(BTreeMap::from([(selector.key, contents)])),
        ..Default::default()
    })
}

/// Build the config Secret the MaxScale exporter reads.
pub fn build_maxscale_exporter_config_secret(maxscale: &MaxScale, password: &str) -> Result<Secret> {
    let selector = maxscale.metrics_config_secret_key_ref();
    let contents = format!(
        "[maxscale_exporter]\nmaxscale_url = {url}\nmaxscale_username = {username}\nmaxscale_password = {password}\n",
        url = maxscale.admin_url(),
        username = maxscale.spec.auth.metrics_username,
    );

    Ok(Secret {
        metadata: owned_meta(&selector.name, maxscale)?,
        string_data: Some(BTreeMap::from([(selector.key, contents)])),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mariadb_common::crd::{
        MariaDbMetrics, MariaDbRef, MariaDbSpec, MaxScaleAuth, MaxScaleSpec, SecretKeySelector,
    };

    fn sample_mariadb() -> MariaDB {
        let mut mariadb = MariaDB::new(
            "mariadb",
            MariaDbSpec {
                image: "mariadb:11.4".into(),
                port: 3307,
                root_password_secret_key_ref: SecretKeySelector {
                    name: "root".into(),
                    key: "password".into(),
                },
                my_cnf_config_map_key_ref: None,
                metrics: Some(MariaDbMetrics {
                    enabled: true,
                    username: "exporter".into(),
                    ..MariaDbMetrics::default()
                }),
                tls: None,
                image_pull_secrets: vec![],
            },
        );
        mariadb.metadata.namespace = Some("db".into());
        mariadb.metadata.uid = Some("uid-mariadb".into());
        mariadb
    }

    #[test]
    fn mariadb_config_has_client_section() {
        let secret = build_exporter_config_secret(&sample_mariadb(), "hunter2").unwrap();
        assert_eq!(secret.metadata.name.as_deref(), Some("mariadb-metrics-config"));
        let data = secret.string_data.unwrap();
        let config = data.get("exporter.cnf").unwrap();
        assert_eq!(
            config,
            "[client]\nuser = exporter\npassword = hunter2\nhost = mariadb.db.svc.cluster.local\nport = 3307\n"
        );
    }

    #[test]
    fn mariadb_config_is_owned_by_the_mariadb() {
        let secret = build_exporter_config_secret(&sample_mariadb(), "hunter2").unwrap();
        let owner = &secret.metadata.owner_references.unwrap()[0];
        assert_eq!(owner.kind, "MariaDB");
        assert_eq!(owner.uid, "uid-mariadb");
    }

    #[test]
    fn maxscale_config_points_at_admin_api() {
        let mut maxscale = MaxScale::new(
            "maxscale",
            MaxScaleSpec {
                mariadb_ref: MariaDbRef {
                    name: "mariadb".into(),
                    namespace: None,
                },
                admin_port: 8989,
                auth: MaxScaleAuth::default(),
                metrics: None,
                image_pull_secrets: vec![],
            },
        );
        maxscale.metadata.namespace = Some("db".into());
        maxscale.metadata.uid = Some("uid-maxscale".into());

        let secret = build_maxscale_exporter_config_secret(&maxscale, "pw").unwrap();
        assert_eq!(secret.metadata.name.as_deref(), Some("maxscale-metrics-config"));
        let config = secret.string_data.unwrap().remove("exporter.ini").unwrap();
        assert!(config.contains("maxscale_url = http://maxscale.db.svc.cluster.local:8989\n"));
        assert!(config.contains("maxscale_username = metrics\n"));
        assert!(config.contains("maxscale_password = pw\n"));
    }
}
