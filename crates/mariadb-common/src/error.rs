//! Error types for the MariaDB operator
//!
//! Errors are structured with fields to aid debugging in production. The
//! variants follow the operator's failure taxonomy: startup errors
//! (`UnsupportedFieldPath`, `WatchRegistration`) abort bootstrap, everything
//! else is returned to the controller runtime which owns requeue and backoff.

use thiserror::Error;

/// Main error type for operator operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A field-path token with no registered extractor
    #[error("unsupported field path for {owner_kind}: {token}")]
    UnsupportedFieldPath {
        /// Owner kind the lookup was made against
        owner_kind: String,
        /// The offending token
        token: String,
    },

    /// A watch binding could not be established at startup
    #[error("error watching '{token}' ({watched_kind} -> {owner_kind}): {message}")]
    WatchRegistration {
        /// Field-path token whose binding failed
        token: String,
        /// Kind being watched (ConfigMap, Secret)
        watched_kind: String,
        /// Kind whose reconciliation the watch triggers
        owner_kind: String,
        /// Description of what failed
        message: String,
    },

    /// Existence check of a prerequisite resource failed
    #[error("error checking if user {user} exists for {owner}: {message}")]
    PrerequisiteCheck {
        /// Owner being finalized (namespace/name)
        owner: String,
        /// Prerequisite that was being checked
        user: String,
        /// Description of what failed
        message: String,
    },

    /// An object the owner references does not exist (yet)
    #[error("{kind} {name} referenced by {owner} not found")]
    DependencyNotFound {
        /// Owner holding the reference (namespace/name)
        owner: String,
        /// Kind of the missing object
        kind: String,
        /// Name of the missing object (namespace/name)
        name: String,
    },

    /// A side effect against the live database failed
    #[error("database operation failed for {owner}: {source}")]
    ExternalEffect {
        /// Owner the effect was applied for (namespace/name)
        owner: String,
        /// Classified database failure
        #[source]
        source: ExternalEffectError,
    },

    /// Optimistic concurrency check rejected a patch
    #[error("conflict patching {kind} {name}: object changed concurrently")]
    PatchConflict {
        /// Kind of the patched object
        kind: String,
        /// Name of the patched object (namespace/name)
        name: String,
    },

    /// Cancellation was observed before the operation completed
    #[error("{operation} cancelled")]
    Cancelled {
        /// What was interrupted
        operation: String,
    },

    /// Validation error for CRD specs
    #[error("validation error for {resource}: {message}")]
    Validation {
        /// Resource with invalid configuration (namespace/name)
        resource: String,
        /// Description of what's invalid
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

/// Classified failure of an operation against the database engine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExternalEffectError {
    /// Target of the operation does not exist (grant, user or server)
    #[error("not found: {0}")]
    NotFound(String),

    /// Connection-level failure that may succeed on a later attempt
    #[error("transient failure: {0}")]
    Transient(String),

    /// Failure that will not go away without operator intervention
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl ExternalEffectError {
    /// Whether the controller should keep retrying
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent(_))
    }
}

impl Error {
    /// Create an unsupported field path error
    pub fn unsupported_field_path(owner_kind: impl Into<String>, token: impl Into<String>) -> Self {
        Self::UnsupportedFieldPath {
            owner_kind: owner_kind.into(),
            token: token.into(),
        }
    }

    /// Create a watch registration error
    pub fn watch_registration(
        token: impl Into<String>,
        watched_kind: impl Into<String>,
        owner_kind: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::WatchRegistration {
            token: token.into(),
            watched_kind: watched_kind.into(),
            owner_kind: owner_kind.into(),
            message: msg.into(),
        }
    }

    /// Create a prerequisite check error
    pub fn prerequisite_check(
        owner: impl Into<String>,
        user: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::PrerequisiteCheck {
            owner: owner.into(),
            user: user.into(),
            message: msg.into(),
        }
    }

    /// Create a missing-dependency error
    pub fn dependency_not_found(
        owner: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::DependencyNotFound {
            owner: owner.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Wrap a classified database failure
    pub fn external_effect(owner: impl Into<String>, source: ExternalEffectError) -> Self {
        Self::ExternalEffect {
            owner: owner.into(),
            source,
        }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a validation error with resource context
    pub fn validation_for(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(msg: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Convert a patch failure, turning HTTP 409 into `PatchConflict`
    pub fn from_patch(source: kube::Error, kind: impl Into<String>, name: impl Into<String>) -> Self {
        match source {
            kube::Error::Api(ae) if ae.code == 409 => Self::PatchConflict {
                kind: kind.into(),
                name: name.into(),
            },
            source => Self::Kube { source },
        }
    }

    /// Whether the controller runtime should retry this error.
    ///
    /// Startup errors are never retried: they abort the process instead.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UnsupportedFieldPath { .. } | Self::WatchRegistration { .. } => false,
            Self::Validation { .. } => false,
            Self::ExternalEffect { source, .. } => source.is_retryable(),
            Self::Kube { .. }
            | Self::PrerequisiteCheck { .. }
            | Self::DependencyNotFound { .. }
            | Self::PatchConflict { .. }
            | Self::Cancelled { .. }
            | Self::Serialization { .. }
            | Self::Internal { .. } => true,
        }
    }
}

/// Whether a kube error is an HTTP 404
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}
