//! Dependency indexes for the MariaDB operator
//!
//! Owners (MariaDB, MaxScale) reference ConfigMaps and Secrets by name from
//! their specs. This crate turns those references into reconcile triggers:
//! - [`IndexRegistry`] maps a field-path token to an extractor that reads the
//!   referenced names out of an owner's spec
//! - [`WatchBinder`] binds a watched kind to an owner kind through a token and
//!   a [`LabelPredicate`], and attaches the resulting watches to a
//!   `kube::runtime::Controller`
//! - [`index_mariadb`] and [`index_maxscale`] are the fixed startup bindings
//!
//! Bindings are established once at startup and never change afterwards. A
//! failure for any token aborts setup and no binding is attached.

#![deny(missing_docs)]

mod binder;
mod owners;
mod predicate;
mod registrar;
mod registry;
mod setup;

pub use binder::{WatchBinder, WatchBinderBuilder, WatchBinding};
pub use predicate::LabelPredicate;
#[cfg(any(test, feature = "testing"))]
pub use registrar::RecordingRegistrar;
pub use registrar::{KubeWatchRegistrar, WatchRegistrar, WatchRequest};
pub use registry::{Extractor, IndexRegistry, Indexed, WatchedKind};
pub use setup::{index_mariadb, index_maxscale};
