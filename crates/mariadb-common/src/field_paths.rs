//! Field-path tokens naming cross-resource references in CRD specs
//!
//! These strings are a versioned contract: external tooling that addresses the
//! operator's indexes uses the literal values. Never rename one in place; add a
//! new token instead.

/// MariaDB: ConfigMap holding extra `my.cnf` configuration
pub const MARIADB_MY_CNF_CONFIG_MAP: &str = ".spec.myCnfConfigMapKeyRef.name";

/// MariaDB: Secret holding the metrics exporter password
pub const MARIADB_METRICS_PASSWORD_SECRET: &str = ".spec.metrics.passwordSecretKeyRef";

/// MariaDB: Secret holding the server CA bundle
pub const MARIADB_TLS_SERVER_CA_SECRET: &str = ".spec.tls.serverCASecretRef";

/// MariaDB: Secret holding the server certificate
pub const MARIADB_TLS_SERVER_CERT_SECRET: &str = ".spec.tls.serverCertSecretRef";

/// MariaDB: Secret holding the client CA bundle
pub const MARIADB_TLS_CLIENT_CA_SECRET: &str = ".spec.tls.clientCASecretRef";

/// MariaDB: Secret holding the client certificate
pub const MARIADB_TLS_CLIENT_CERT_SECRET: &str = ".spec.tls.clientCertSecretRef";

/// MaxScale: Secret holding the metrics exporter password
pub const MAXSCALE_METRICS_PASSWORD_SECRET: &str = ".spec.auth.metricsPasswordSecretKeyRef.name";

/// All MariaDB tokens, in registration order
pub const MARIADB_FIELD_PATHS: &[&str] = &[
    MARIADB_MY_CNF_CONFIG_MAP,
    MARIADB_METRICS_PASSWORD_SECRET,
    MARIADB_TLS_SERVER_CA_SECRET,
    MARIADB_TLS_SERVER_CERT_SECRET,
    MARIADB_TLS_CLIENT_CA_SECRET,
    MARIADB_TLS_CLIENT_CERT_SECRET,
];

/// All MaxScale tokens, in registration order
pub const MAXSCALE_FIELD_PATHS: &[&str] = &[MAXSCALE_METRICS_PASSWORD_SECRET];
