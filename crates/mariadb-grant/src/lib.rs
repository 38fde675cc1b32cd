//! Grant controller for the MariaDB operator
//!
//! A Grant assigns privileges to a user on a MariaDB instance. Reconciling a
//! live Grant attaches the revoke finalizer and executes `GRANT`. Deleting a
//! Grant runs the [`FinalizationCoordinator`]:
//! - poll briefly for the User the grant depends on
//! - if the User is gone there is nothing to revoke
//! - if it is still there after the window, execute `REVOKE`
//! - only then remove the finalizer, with a version-conditioned patch

#![deny(missing_docs)]

mod controller;
mod finalizer;
mod kube_client;
pub mod poll;
#[cfg(test)]
mod test_utils;

pub use controller::{error_policy, reconcile, Context, ContextBuilder};
pub use finalizer::{FinalizationCoordinator, Finalized};
pub use kube_client::{GrantKubeClient, GrantKubeClientImpl};
pub use poll::{PollConfig, Presence};
