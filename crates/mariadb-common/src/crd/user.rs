//! User CRD: a database user on a MariaDB instance
//!
//! Grants depend on users: a Grant's `spec.username` names the User resource in
//! the Grant's namespace, and that User's existence decides whether deleting
//! the Grant has to revoke anything.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Condition, MariaDbRef, SecretKeySelector};

/// User is a database account managed on a MariaDB instance.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "k8s.mariadb.com",
    version = "v1alpha1",
    kind = "User",
    plural = "users",
    shortname = "umdb",
    namespaced,
    status = "UserStatus",
    printcolumn = r#"{"name":"MariaDB","type":"string","jsonPath":".spec.mariaDbRef.name"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    /// MariaDB instance the user lives on
    #[serde(rename = "mariaDbRef")]
    pub mariadb_ref: MariaDbRef,

    /// Account name; defaults to the resource name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Secret key holding the account password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret_key_ref: Option<SecretKeySelector>,

    /// Maximum simultaneous connections for the account
    #[serde(default = "default_max_user_connections")]
    pub max_user_connections: i32,
}

fn default_max_user_connections() -> i32 {
    10
}

/// User status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
