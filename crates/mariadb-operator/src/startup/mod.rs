//! Startup utilities for the MariaDB operator

mod crds;
mod index;

pub use crds::{all_crds, crd_manifests, ensure_crds_installed};
pub use index::{build_indexes, Indexes};
