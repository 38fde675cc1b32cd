//! Database side effects for the MariaDB operator
//!
//! The controllers only see two traits: [`SqlConnector`] opens a session on
//! the MariaDB a Grant points at, and [`SqlClient`] applies or revokes a
//! [`GrantDescriptor`](mariadb_common::crd::GrantDescriptor) on it. Failures
//! are classified into [`ExternalEffectError`](mariadb_common::ExternalEffectError)
//! so callers can treat "already gone" as success.

#![deny(missing_docs)]

mod client;
mod connector;
mod mysql;
pub mod statement;

pub use client::{SqlClient, SqlConnector};
pub use connector::KubeSqlConnector;
pub use mysql::{classify, classify_server_error, MySqlClient};
