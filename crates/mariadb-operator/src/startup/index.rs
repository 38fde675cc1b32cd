//! Dependency index setup
//!
//! Runs once before any controller starts. A failure here is fatal: an owner
//! whose references are not watched would silently miss dependency changes.

use mariadb_common::crd::{MariaDB, MaxScale};
use mariadb_common::Result;
use mariadb_index::{index_mariadb, index_maxscale, WatchBinder, WatchRegistrar};

/// Watch bindings for every indexed owner kind
pub struct Indexes {
    /// ConfigMap/Secret bindings for MariaDB
    pub mariadb: WatchBinder<MariaDB>,
    /// Secret bindings for MaxScale
    pub maxscale: WatchBinder<MaxScale>,
}

/// Register every owner's watch bindings, MariaDB first
pub async fn build_indexes(registrar: &dyn WatchRegistrar) -> Result<Indexes> {
    let mariadb = index_mariadb(registrar).await?;
    tracing::info!(bindings = mariadb.bindings().len(), "MariaDB dependency index ready");
    let maxscale = index_maxscale(registrar).await?;
    tracing::info!(bindings = maxscale.bindings().len(), "MaxScale dependency index ready");
    Ok(Indexes { mariadb, maxscale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mariadb_common::field_paths::{
        MARIADB_FIELD_PATHS, MARIADB_MY_CNF_CONFIG_MAP, MAXSCALE_METRICS_PASSWORD_SECRET,
    };
    use mariadb_common::Error;
    use mariadb_index::RecordingRegistrar;

    #[tokio::test]
    async fn both_owners_are_bound() {
        let registrar = RecordingRegistrar::new();
        let indexes = build_indexes(&registrar).await.unwrap();
        assert_eq!(indexes.mariadb.bindings().len(), MARIADB_FIELD_PATHS.len());
        assert_eq!(indexes.maxscale.bindings().len(), 1);
        assert_eq!(registrar.requests().len(), MARIADB_FIELD_PATHS.len() + 1);
    }

    #[tokio::test]
    async fn mariadb_failure_skips_maxscale() {
        let registrar = RecordingRegistrar::failing_on(MARIADB_MY_CNF_CONFIG_MAP);
        let err = build_indexes(&registrar).await.err().unwrap();
        assert!(matches!(err, Error::WatchRegistration { .. }));
        assert_eq!(registrar.requests().len(), 1);
    }

    #[tokio::test]
    async fn maxscale_failure_is_fatal() {
        let registrar = RecordingRegistrar::failing_on(MAXSCALE_METRICS_PASSWORD_SECRET);
        let err = build_indexes(&registrar).await.err().unwrap();
        assert!(err.to_string().contains(MAXSCALE_METRICS_PASSWORD_SECRET));
        assert!(!err.is_retryable());
    }
}
