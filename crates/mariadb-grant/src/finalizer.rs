//! Finalizer-driven teardown of Grants
//!
//! State machine per Grant:
//! - `NoFinalizer` → `FinalizerAttached`: first reconcile of a live Grant
//! - `FinalizerAttached` → `Finalizing`: deletion timestamp observed
//! - `Finalizing` → `Removed`: revoke confirmed unnecessary or done, then a
//!   single version-conditioned patch drops the finalizer
//!
//! Nothing is cached between attempts. Any failure leaves the finalizer in
//! place and the whole sequence runs again on the next reconcile.

use std::sync::Arc;

use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mariadb_common::crd::Grant;
use mariadb_common::events::{actions, reasons, EventPublisher};
use mariadb_common::{Error, ExternalEffectError, Result, GRANT_FINALIZER};
use mariadb_sql::SqlConnector;

use crate::kube_client::GrantKubeClient;
use crate::poll::{poll_absence, PollConfig, PollError, Presence};

/// What a finalize pass did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finalized {
    /// No finalizer was present, nothing to do
    NotAttached,
    /// The User was already gone; finalizer removed without revoking
    RevokeSkipped,
    /// Privileges revoked (or already absent); finalizer removed
    Revoked,
}

/// Drives the Grant finalizer.
pub struct FinalizationCoordinator {
    kube: Arc<dyn GrantKubeClient>,
    sql: Arc<dyn SqlConnector>,
    events: Arc<dyn EventPublisher>,
    poll: PollConfig,
    cancel: CancellationToken,
}

impl FinalizationCoordinator {
    /// Create a coordinator
    pub fn new(
        kube: Arc<dyn GrantKubeClient>,
        sql: Arc<dyn SqlConnector>,
        events: Arc<dyn EventPublisher>,
        poll: PollConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            kube,
            sql,
            events,
            poll,
            cancel,
        }
    }

    /// Add the finalizer if it is missing.
    ///
    /// Returns whether a patch was sent; a Grant that already carries the
    /// finalizer is left untouched.
    pub async fn attach(&self, grant: &Grant) -> Result<bool> {
        if grant.has_finalizer() {
            return Ok(false);
        }
        let mut finalizers = grant.finalizers().to_vec();
        finalizers.push(GRANT_FINALIZER.to_string());
        self.kube.patch_finalizers(grant, finalizers).await?;
        debug!(grant = %grant.key(), "Finalizer attached");
        Ok(true)
    }

    /// Run the `Finalizing` state for a Grant marked for deletion.
    pub async fn finalize(&self, grant: &Grant) -> Result<Finalized> {
        if !grant.has_finalizer() {
            return Ok(Finalized::NotAttached);
        }

        let key = grant.key();
        let (namespace, user) = grant.user_key();

        let presence = poll_absence(self.poll, &self.cancel, || {
            self.kube.user_exists(&namespace, &user)
        })
        .await
        .map_err(|e| match e {
            PollError::Check(e) => Error::prerequisite_check(&key, &user, e.to_string()),
            PollError::Cancelled => Error::cancelled(format!("finalizing grant {key}")),
        })?;

        let outcome = match presence {
            Presence::Absent => {
                info!(grant = %key, user = %user, "User already deleted, skipping revoke");
                self.publish(
                    grant,
                    EventType::Normal,
                    reasons::REVOKE_SKIPPED,
                    format!("User {user} not found, nothing to revoke"),
                )
                .await;
                Finalized::RevokeSkipped
            }
            Presence::StillPresent => {
                if let Err(e) = self.revoke(grant).await {
                    warn!(grant = %key, error = %e, "Revoke failed, keeping finalizer");
                    self.publish(
                        grant,
                        EventType::Warning,
                        reasons::REVOKE_FAILED,
                        e.to_string(),
                    )
                    .await;
                    return Err(Error::external_effect(&key, e));
                }
                self.publish(
                    grant,
                    EventType::Normal,
                    reasons::REVOKE_SUCCEEDED,
                    format!("Privileges revoked from {user}"),
                )
                .await;
                Finalized::Revoked
            }
        };

        self.remove(grant).await?;
        Ok(outcome)
    }

    // NotFound from either the connection or the REVOKE means the grant
    // cannot exist anymore.
    async fn revoke(&self, grant: &Grant) -> std::result::Result<(), ExternalEffectError> {
        let client = match self.sql.connect(grant).await {
            Ok(client) => client,
            Err(ExternalEffectError::NotFound(msg)) => {
                debug!(grant = %grant.key(), %msg, "MariaDB not found, treating revoke as done");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let result = match client.revoke(&grant.descriptor()).await {
            Err(ExternalEffectError::NotFound(msg)) => {
                debug!(grant = %grant.key(), %msg, "Grant already absent");
                Ok(())
            }
            other => other,
        };
        client.close().await;
        result
    }

    async fn remove(&self, grant: &Grant) -> Result<()> {
        let remaining: Vec<String> = grant
            .finalizers()
            .iter()
            .filter(|f| f.as_str() != GRANT_FINALIZER)
            .cloned()
            .collect();
        self.kube.patch_finalizers(grant, remaining).await?;
        info!(grant = %grant.key(), "Finalizer removed");
        self.publish(
            grant,
            EventType::Normal,
            reasons::FINALIZER_REMOVED,
            "Grant released for deletion".to_string(),
        )
        .await;
        Ok(())
    }

    async fn publish(&self, grant: &Grant, type_: EventType, reason: &str, note: String) {
        let reference: ObjectReference = grant.object_ref(&());
        self.events
            .publish(&reference, type_, reason, actions::FINALIZE, Some(note))
            .await;
    }
}
