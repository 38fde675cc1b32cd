//! Labels, annotations and owner references stamped on generated objects

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

use mariadb_common::{Error, Result};

/// Selector label naming the component
pub const NAME_LABEL: &str = "app.kubernetes.io/name";
/// Selector label naming the instance
pub const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";
/// Label marking objects this operator manages
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Pod-template annotation carrying the metrics password Secret's version.
///
/// Changing it rolls the exporter pods so they pick up a rotated password.
pub const METRICS_PASSWORD_VERSION_ANNOTATION: &str = "k8s.mariadb.com/metrics-password-version";

/// Component name every exporter Deployment selects on
const EXPORTER_COMPONENT: &str = "exporter";

/// Selector labels of an exporter named `name`
pub fn metrics_selector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (NAME_LABEL.to_string(), EXPORTER_COMPONENT.to_string()),
        (INSTANCE_LABEL.to_string(), name.to_string()),
    ])
}

/// Object labels: the selector labels plus the managed-by marker
pub fn metrics_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = metrics_selector_labels(name);
    labels.insert(
        MANAGED_BY_LABEL.to_string(),
        mariadb_common::FIELD_MANAGER.to_string(),
    );
    labels
}

/// Controller owner reference to `owner`.
///
/// Fails for objects that were never persisted, since those have no uid.
pub fn controller_ref<K>(owner: &K) -> Result<OwnerReference>
where
    K: Resource<DynamicType = ()>,
{
    owner.controller_owner_ref(&()).ok_or_else(|| {
        Error::internal_with_context(
            "owner has no uid",
            format!(
                "{}/{}",
                owner.namespace().unwrap_or_default(),
                owner.name_any()
            ),
        )
    })
}

/// Metadata for an object named `name` in `owner`'s namespace, owned by `owner`
pub fn owned_meta<K>(name: &str, owner: &K) -> Result<ObjectMeta>
where
    K: Resource<DynamicType = ()>,
{
    Ok(ObjectMeta {
        name: Some(name.to_string()),
        namespace: owner.namespace(),
        labels: Some(metrics_labels(name)),
        owner_references: Some(vec![controller_ref(owner)?]),
        ..Default::default()
    })
}
