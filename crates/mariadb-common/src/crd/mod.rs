//! Custom Resource Definitions for the MariaDB operator

mod grant;
mod mariadb;
mod maxscale;
mod types;
mod user;

pub use grant::{Grant, GrantDescriptor, GrantSpec, GrantStatus};
pub use mariadb::{
    Exporter, MariaDB, MariaDbMetrics, MariaDbSpec, MariaDbStatus, Tls, EXPORTER_CONFIG_KEY,
};
pub use maxscale::{
    MaxScale, MaxScaleAuth, MaxScaleMetrics, MaxScaleSpec, MaxScaleStatus,
    MAXSCALE_EXPORTER_CONFIG_KEY,
};
pub use types::{
    is_ready, set_condition, Condition, ConditionStatus, ConfigMapKeySelector,
    LocalObjectReference, MariaDbRef, SecretKeySelector, CONDITION_READY,
};
pub use user::{User, UserSpec, UserStatus};
