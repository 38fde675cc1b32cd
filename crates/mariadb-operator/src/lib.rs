//! MariaDB Kubernetes operator
//!
//! Wires the Grant controller and the MariaDB/MaxScale exporter controllers
//! to the dependency indexes built at startup.

#![deny(missing_docs)]

/// Runtime configuration
pub mod config;
/// MariaDB and MaxScale exporter controllers
pub mod controller;
/// Controller future construction
pub mod controller_runner;
/// Startup utilities (CRD install, dependency indexes)
pub mod startup;
