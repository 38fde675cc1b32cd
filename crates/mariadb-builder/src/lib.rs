//! Resource synthesis for the MariaDB operator
//!
//! Pure functions from a custom resource to the Kubernetes objects that back
//! its metrics exporter. Nothing here talks to the API server; the controllers
//! apply the results.

#![deny(missing_docs)]

pub mod deployment;
pub mod labels;
pub mod secret;

pub use deployment::{
    build_exporter_deployment, build_maxscale_exporter_deployment, with_password_version,
    METRICS_PORT_NAME,
};
pub use labels::METRICS_PASSWORD_VERSION_ANNOTATION;
pub use secret::{build_exporter_config_secret, build_maxscale_exporter_config_secret};
