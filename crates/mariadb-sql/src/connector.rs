//! Connector resolving a Grant's MariaDB through the Kubernetes API

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use tracing::debug;

use mariadb_common::crd::{Grant, MariaDB};
use mariadb_common::ExternalEffectError;

use crate::client::{SqlClient, SqlConnector};
use crate::mysql::MySqlClient;

/// Account the operator administers grants with
const ROOT_USER: &str = "root";

/// Connects as root to the MariaDB a Grant references.
pub struct KubeSqlConnector {
    client: Client,
}

impl KubeSqlConnector {
    /// Create a connector using the given Kubernetes client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn root_password(
        &self,
        namespace: &str,
        mariadb: &MariaDB,
    ) -> Result<String, ExternalEffectError> {
        let selector = &mariadb.spec.root_password_secret_key_ref;
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = secrets
            .get_opt(&selector.name)
            .await
            .map_err(|e| ExternalEffectError::Transient(e.to_string()))?
            .ok_or_else(|| {
                ExternalEffectError::Permanent(format!(
                    "root password secret {namespace}/{} not found",
                    selector.name
                ))
            })?;
        secret_value(&secret, &selector.key)
    }
}

#[async_trait]
impl SqlConnector for KubeSqlConnector {
    async fn connect(&self, grant: &Grant) -> Result<Box<dyn SqlClient>, ExternalEffectError> {
        let (namespace, name) = grant.mariadb_key();
        let mariadbs: Api<MariaDB> = Api::namespaced(self.client.clone(), &namespace);
        let mariadb = mariadbs
            .get_opt(&name)
            .await
            .map_err(|e| ExternalEffectError::Transient(e.to_string()))?
            .ok_or_else(|| ExternalEffectError::NotFound(format!("MariaDB {namespace}/{name}")))?;

        let password = self.root_password(&namespace, &mariadb).await?;
        let port = u16::try_from(mariadb.spec.port).map_err(|_| {
            ExternalEffectError::Permanent(format!("invalid port {}", mariadb.spec.port))
        })?;
        let host = mariadb.internal_host();

        debug!(mariadb = %name, %host, port, "Connecting to MariaDB");
        let client = MySqlClient::connect(&host, port, ROOT_USER, &password).await?;
        Ok(Box::new(client))
    }
}

/// Read a UTF-8 value out of a Secret's data.
fn secret_value(secret: &Secret, key: &str) -> Result<String, ExternalEffectError> {
    let name = secret.metadata.name.as_deref().unwrap_or_default();
    let bytes = secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .ok_or_else(|| ExternalEffectError::Permanent(format!("secret {name} has no key {key}")))?;
    String::from_utf8(bytes.0.clone()).map_err(|_| {
        ExternalEffectError::Permanent(format!("secret {name} key {key} is not valid UTF-8"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn sample_secret(key: &str, value: &[u8]) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("mariadb-root".into()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                key.to_string(),
                ByteString(value.to_vec()),
            )])),
            ..Default::default()
        }
    }

    #[test]
    fn reads_password_key() {
        let secret = sample_secret("password", b"s3cr3t");
        assert_eq!(secret_value(&secret, "password").unwrap(), "s3cr3t");
    }

    #[test]
    fn missing_key_is_permanent() {
        let secret = sample_secret("password", b"s3cr3t");
        let err = secret_value(&secret, "root-password").unwrap_err();
        assert!(matches!(err, ExternalEffectError::Permanent(_)));
        assert!(err.to_string().contains("root-password"));
    }

    #[test]
    fn non_utf8_value_is_permanent() {
        let secret = sample_secret("password", &[0xff, 0xfe]);
        assert!(matches!(
            secret_value(&secret, "password"),
            Err(ExternalEffectError::Permanent(_))
        ));
    }
}
