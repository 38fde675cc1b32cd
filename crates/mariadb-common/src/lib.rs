//! Common types for the MariaDB operator: CRDs, errors, and shared contracts
//!
//! Everything that more than one controller crate needs lives here so that the
//! string contracts (field-path tokens, labels, finalizer names) have exactly
//! one definition.

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod field_paths;

pub use error::{Error, ExternalEffectError};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group of every CRD served by the operator
pub const API_GROUP: &str = "k8s.mariadb.com";

/// API version of every CRD served by the operator
pub const API_VERSION: &str = "k8s.mariadb.com/v1alpha1";

/// Label that opts a ConfigMap or Secret into triggering owner reconciliation.
///
/// Presence is enough; the value is ignored.
pub const WATCH_LABEL: &str = "k8s.mariadb.com/watch";

/// Field manager used for server-side apply and merge patches
pub const FIELD_MANAGER: &str = "mariadb-operator";

/// Finalizer that blocks Grant deletion until the privileges are revoked
pub const GRANT_FINALIZER: &str = "grant.k8s.mariadb.com/finalizer";

/// Default MariaDB server port
pub const DEFAULT_MARIADB_PORT: i32 = 3306;

/// Requeue delay after a failed reconcile.
///
/// Conflicts retry almost immediately against the fresh object; errors that
/// need operator intervention back off for a minute.
pub fn requeue_delay(error: &Error) -> std::time::Duration {
    match error {
        Error::PatchConflict { .. } => std::time::Duration::from_secs(1),
        e if !e.is_retryable() => std::time::Duration::from_secs(60),
        _ => std::time::Duration::from_secs(5),
    }
}

/// Error policy shared by every controller.
pub fn default_error_policy<K, C>(
    obj: std::sync::Arc<K>,
    error: &Error,
    _ctx: std::sync::Arc<C>,
) -> kube::runtime::controller::Action
where
    K: kube::Resource<DynamicType = ()>,
{
    use kube::ResourceExt;
    tracing::warn!(
        kind = %K::kind(&()),
        name = %obj.name_any(),
        namespace = obj.namespace().as_deref().unwrap_or_default(),
        error = %error,
        "Reconcile failed, will retry"
    );
    kube::runtime::controller::Action::requeue(requeue_delay(error))
}
