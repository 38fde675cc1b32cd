//! Label opt-in filter for watched objects

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use mariadb_common::WATCH_LABEL;

/// Admits watched objects carrying a label key, whatever its value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelPredicate {
    key: String,
}

impl LabelPredicate {
    /// Require the given label key to be present
    pub fn has_label(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Require the operator's watch opt-in label
    pub fn watch_enabled() -> Self {
        Self::has_label(WATCH_LABEL)
    }

    /// Label selector equivalent, usable server side
    pub fn selector(&self) -> &str {
        &self.key
    }

    /// Whether an object passes the filter
    pub fn matches(&self, meta: &ObjectMeta) -> bool {
        meta.labels
            .as_ref()
            .is_some_and(|labels| labels.contains_key(&self.key))
    }
}

impl Default for LabelPredicate {
    fn default() -> Self {
        Self::watch_enabled()
    }
}
