//! Token-keyed extractor registry
//!
//! Each owner kind has one registry, built once on first use and read-only
//! afterwards. Adding a token is a new entry, not a new branch.

use std::collections::BTreeMap;
use std::fmt;

use kube::Resource;
use serde::de::DeserializeOwned;

use mariadb_common::{Error, Result};

/// Reads the names an owner's spec references at one field path.
///
/// Extractors never fail: an unset reference, an empty name or a disabled
/// feature gate all yield an empty list.
pub type Extractor<K> = fn(&K) -> Vec<String>;

/// Kinds whose changes can trigger owner reconciliation
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WatchedKind {
    /// core/v1 ConfigMap
    ConfigMap,
    /// core/v1 Secret
    Secret,
}

impl WatchedKind {
    /// Kubernetes kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
        }
    }
}

impl fmt::Display for WatchedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map from field-path token to extractor for one owner kind.
pub struct IndexRegistry<K> {
    owner_kind: &'static str,
    extractors: BTreeMap<&'static str, Extractor<K>>,
}

impl<K> IndexRegistry<K> {
    /// Create an empty registry for the given owner kind
    pub fn new(owner_kind: &'static str) -> Self {
        Self {
            owner_kind,
            extractors: BTreeMap::new(),
        }
    }

    /// Add an extractor for a token
    pub fn with(mut self, token: &'static str, extractor: Extractor<K>) -> Self {
        self.extractors.insert(token, extractor);
        self
    }

    /// Kind of the owners this registry reads
    pub fn owner_kind(&self) -> &'static str {
        self.owner_kind
    }

    /// Look up the extractor for a token.
    ///
    /// Fails with `UnsupportedFieldPath` naming the token when nothing is
    /// registered for it.
    pub fn extractor_for(&self, token: &str) -> Result<Extractor<K>> {
        self.extractors
            .get(token)
            .copied()
            .ok_or_else(|| Error::unsupported_field_path(self.owner_kind, token))
    }

    /// Registered tokens, in lexical order
    pub fn tokens(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.extractors.keys().copied()
    }
}

/// An owner kind with a field-path index.
pub trait Indexed:
    Resource<DynamicType = ()> + Clone + DeserializeOwned + fmt::Debug + Send + Sync + 'static
{
    /// The kind's extractor registry
    fn index_registry() -> &'static IndexRegistry<Self>;
}
