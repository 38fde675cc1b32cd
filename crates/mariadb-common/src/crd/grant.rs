//! Grant CRD: privileges assigned to a user over a database/table scope

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Condition, MariaDbRef};
use crate::GRANT_FINALIZER;

/// Grant assigns privileges to a database user.
///
/// Example:
/// ```yaml
/// apiVersion: k8s.mariadb.com/v1alpha1
/// kind: Grant
/// metadata:
///   name: grant-app
/// spec:
///   mariaDbRef:
///     name: mariadb
///   privileges: ["SELECT", "INSERT", "UPDATE"]
///   database: app
///   table: "*"
///   username: app
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "k8s.mariadb.com",
    version = "v1alpha1",
    kind = "Grant",
    plural = "grants",
    shortname = "gmdb",
    namespaced,
    status = "GrantStatus",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Database","type":"string","jsonPath":".spec.database"}"#,
    printcolumn = r#"{"name":"Table","type":"string","jsonPath":".spec.table"}"#,
    printcolumn = r#"{"name":"Username","type":"string","jsonPath":".spec.username"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GrantSpec {
    /// MariaDB instance the grant is applied on
    #[serde(rename = "mariaDbRef")]
    pub mariadb_ref: MariaDbRef,

    /// Privileges to grant (e.g. `SELECT`, `ALL PRIVILEGES`)
    pub privileges: Vec<String>,

    /// Database scope, `*` for all
    #[serde(default = "default_scope")]
    pub database: String,

    /// Table scope, `*` for all
    #[serde(default = "default_scope")]
    pub table: String,

    /// User receiving the privileges; also names the User resource
    pub username: String,

    /// Whether the user may grant these privileges to others
    #[serde(default)]
    pub grant_option: bool,
}

fn default_scope() -> String {
    "*".to_string()
}

/// Grant status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrantStatus {
    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Desired permission assignment, as sent to the database client.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GrantDescriptor {
    /// Privileges to grant or revoke
    pub privileges: Vec<String>,
    /// Database scope
    pub database: String,
    /// Table scope
    pub table: String,
    /// Account name
    pub username: String,
    /// Whether `GRANT OPTION` is part of the assignment
    pub grant_option: bool,
}

impl Grant {
    /// Permission assignment described by this grant
    pub fn descriptor(&self) -> GrantDescriptor {
        GrantDescriptor {
            privileges: self.spec.privileges.clone(),
            database: self.spec.database.clone(),
            table: self.spec.table.clone(),
            username: self.spec.username.clone(),
            grant_option: self.spec.grant_option,
        }
    }

    /// `namespace/name` key used in logs and errors
    pub fn key(&self) -> String {
        format!(
            "{}/{}",
            self.namespace().unwrap_or_default(),
            self.name_any()
        )
    }

    /// Namespace and name of the User resource this grant depends on
    pub fn user_key(&self) -> (String, String) {
        (
            self.namespace().unwrap_or_default(),
            self.spec.username.clone(),
        )
    }

    /// Namespace and name of the MariaDB this grant is applied on
    pub fn mariadb_key(&self) -> (String, String) {
        let ns = self.namespace().unwrap_or_default();
        (
            self.spec.mariadb_ref.namespace_or(&ns).to_string(),
            self.spec.mariadb_ref.name.clone(),
        )
    }

    /// Whether the revoke finalizer is present
    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == GRANT_FINALIZER)
    }

    /// Whether the API server has marked this grant for deletion
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}
