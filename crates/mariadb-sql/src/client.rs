//! Seams between the controllers and the database

use async_trait::async_trait;

use mariadb_common::crd::{Grant, GrantDescriptor};
use mariadb_common::ExternalEffectError;

/// Opens database sessions for Grants.
#[async_trait]
pub trait SqlConnector: Send + Sync {
    /// Connect to the MariaDB referenced by `grant`.
    ///
    /// A MariaDB that no longer exists is `NotFound`: no grant can live on it.
    async fn connect(&self, grant: &Grant) -> Result<Box<dyn SqlClient>, ExternalEffectError>;
}

/// Applies permission assignments on one database session.
#[async_trait]
pub trait SqlClient: Send + Sync {
    /// Execute `GRANT` for the descriptor
    async fn grant(&self, grant: &GrantDescriptor) -> Result<(), ExternalEffectError>;

    /// Execute `REVOKE` for the descriptor. A missing grant or user is `NotFound`.
    async fn revoke(&self, grant: &GrantDescriptor) -> Result<(), ExternalEffectError>;

    /// Release the session
    async fn close(&self);
}
