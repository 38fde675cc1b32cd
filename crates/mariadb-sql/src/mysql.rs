//! sqlx-backed MySQL/MariaDB client

use std::time::Duration;

use async_trait::async_trait;
use sqlx_core::error::Error as SqlxError;
use sqlx_core::pool::PoolOptions;
use sqlx_core::query::query;
use sqlx_mysql::{MySql, MySqlConnectOptions, MySqlDatabaseError, MySqlPool};
use tracing::{debug, info, instrument};

use mariadb_common::crd::GrantDescriptor;
use mariadb_common::ExternalEffectError;

use crate::client::SqlClient;
use crate::statement::{grant_statement, revoke_statement};

/// Time allowed to open the single pooled connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client holding a single-connection pool to one server.
pub struct MySqlClient {
    pool: MySqlPool,
}

impl MySqlClient {
    /// Open a connection as `username` to `host:port`
    #[instrument(skip(password))]
    pub async fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, ExternalEffectError> {
        let options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(username)
            .password(password);

        let pool = PoolOptions::<MySql>::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(classify)?;

        debug!("MariaDB connection established");
        Ok(Self { pool })
    }

    async fn execute(&self, sql: &str) -> Result<(), ExternalEffectError> {
        query::<MySql>(sql)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }
}

#[async_trait]
impl SqlClient for MySqlClient {
    async fn grant(&self, grant: &GrantDescriptor) -> Result<(), ExternalEffectError> {
        let sql = grant_statement(grant)?;
        self.execute(&sql).await?;
        info!(
            username = %grant.username,
            database = %grant.database,
            table = %grant.table,
            "Privileges granted"
        );
        Ok(())
    }

    async fn revoke(&self, grant: &GrantDescriptor) -> Result<(), ExternalEffectError> {
        let sql = revoke_statement(grant)?;
        self.execute(&sql).await?;
        info!(
            username = %grant.username,
            database = %grant.database,
            table = %grant.table,
            "Privileges revoked"
        );
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Classify a sqlx failure into the operator's taxonomy.
pub fn classify(err: SqlxError) -> ExternalEffectError {
    match err {
        SqlxError::Database(db_err) => match db_err.try_downcast_ref::<MySqlDatabaseError>() {
            Some(mysql) => classify_server_error(mysql.number(), mysql.message()),
            None => ExternalEffectError::Transient(db_err.to_string()),
        },
        SqlxError::Configuration(e) => ExternalEffectError::Permanent(e.to_string()),
        other => ExternalEffectError::Transient(other.to_string()),
    }
}

/// Classify a server error by its MySQL error number.
pub fn classify_server_error(number: u16, message: &str) -> ExternalEffectError {
    let detail = format!("{number}: {message}");
    match number {
        // ER_NONEXISTING_GRANT, ER_NONEXISTING_TABLE_GRANT, ER_PASSWORD_NO_MATCH,
        // ER_CANNOT_USER
        1141 | 1147 | 1133 | 1396 => ExternalEffectError::NotFound(detail),
        // ER_DBACCESS_DENIED_ERROR, ER_ACCESS_DENIED_ERROR, ER_TABLEACCESS_DENIED_ERROR,
        // ER_SPECIFIC_ACCESS_DENIED_ERROR, ER_CANT_CREATE_USER_WITH_GRANT
        1044 | 1045 | 1142 | 1227 | 1410 => ExternalEffectError::Permanent(detail),
        _ => ExternalEffectError::Transient(detail),
    }
}
