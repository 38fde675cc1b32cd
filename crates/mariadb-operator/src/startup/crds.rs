//! CRD installation utilities
//!
//! The operator installs its own CRDs on startup using server-side apply, so
//! the served schema always matches the running binary.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use mariadb_common::crd::{Grant, MariaDB, MaxScale, User};
use mariadb_common::{Error, Result, FIELD_MANAGER};

/// Every CRD the operator serves, in install order
pub fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![MariaDB::crd(), MaxScale::crd(), User::crd(), Grant::crd()]
}

/// Render all CRDs as a multi-document YAML stream
pub fn crd_manifests() -> Result<String> {
    let mut out = String::new();
    for crd in all_crds() {
        let name = crd.metadata.name.as_deref().unwrap_or_default();
        let yaml = serde_yaml::to_string(&crd)
            .map_err(|e| Error::serialization(format!("CRD {}: {}", name, e)))?;
        out.push_str("---\n");
        out.push_str(&yaml);
    }
    Ok(out)
}

/// Server-side apply every CRD
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    for crd in all_crds() {
        let name = crd.metadata.name.clone().unwrap_or_default();
        tracing::info!("Installing {} CRD...", name);
        crds.patch(&name, &params, &Patch::Apply(&crd))
            .await
            .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", name, e))?;
    }

    tracing::info!("MariaDB operator CRDs installed/updated");
    Ok(())
}
