//! Shared mocks and fixtures for the Grant controller tests

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use mockall::mock;

use mariadb_common::crd::{Grant, GrantDescriptor, GrantSpec, MariaDbRef};
use mariadb_common::{ExternalEffectError, GRANT_FINALIZER};
use mariadb_sql::{SqlClient, SqlConnector};

mock! {
    pub Connector {}

    #[async_trait]
    impl SqlConnector for Connector {
        async fn connect(&self, grant: &Grant) -> Result<Box<dyn SqlClient>, ExternalEffectError>;
    }
}

mock! {
    pub Client {}

    #[async_trait]
    impl SqlClient for Client {
        async fn grant(&self, grant: &GrantDescriptor) -> Result<(), ExternalEffectError>;
        async fn revoke(&self, grant: &GrantDescriptor) -> Result<(), ExternalEffectError>;
        async fn close(&self);
    }
}

/// Grant `default/grant-app` for user `app`, at resourceVersion 42
pub fn sample_grant(finalized: bool, deleting: bool) -> Grant {
    let mut grant = Grant::new(
        "grant-app",
        GrantSpec {
            mariadb_ref: MariaDbRef {
                name: "mariadb".into(),
                namespace: None,
            },
            privileges: vec!["SELECT".into()],
            database: "app".into(),
            table: "*".into(),
            username: "app".into(),
            grant_option: false,
        },
    );
    grant.metadata.namespace = Some("default".into());
    grant.metadata.resource_version = Some("42".into());
    grant.metadata.uid = Some("1b4e28ba-2fa1-11d2-883f-0016d3cca427".into());
    if finalized {
        grant.metadata.finalizers = Some(vec![GRANT_FINALIZER.to_string()]);
    }
    if deleting {
        grant.metadata.deletion_timestamp =
            Some(serde_json::from_value::<Time>(serde_json::json!("2024-01-01T00:00:00Z")).unwrap());
    }
    grant
}
