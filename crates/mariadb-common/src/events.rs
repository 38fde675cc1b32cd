//! Kubernetes Events for Grant and exporter reconciliation
//!
//! Controllers report grant, revoke and exporter outcomes on the owning
//! object. Publishing never fails a reconcile; a rejected Event is logged.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Sink for Events about MariaDB, MaxScale and Grant objects
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Record `reason` for `action` on `regarding`
    async fn publish(
        &self,
        regarding: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Publishes through the API server
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Report as `controller`, tagged with `POD_NAME` when set
    pub fn new(client: Client, controller: &str) -> Self {
        let reporter = Reporter {
            controller: controller.to_owned(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        regarding: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_owned(),
            note,
            action: action.to_owned(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, regarding).await {
            let object = regarding.name.as_deref().unwrap_or_default();
            warn!(reason, object, error = %e, "Event rejected");
        }
    }
}

/// Drops every Event
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _: &ObjectReference, _: EventType, _: &str, _: &str, _: Option<String>) {}
}

/// Event reasons
pub mod reasons {
    /// GRANT statement executed
    pub const GRANT_APPLIED: &str = "GrantApplied";
    /// GRANT statement failed
    pub const GRANT_FAILED: &str = "GrantFailed";
    /// User already gone, nothing to revoke
    pub const REVOKE_SKIPPED: &str = "RevokeSkipped";
    /// REVOKE statement executed (or the grant was already absent)
    pub const REVOKE_SUCCEEDED: &str = "RevokeSucceeded";
    /// REVOKE statement failed, deletion stays blocked
    pub const REVOKE_FAILED: &str = "RevokeFailed";
    /// Finalizer removed, deletion may proceed
    pub const FINALIZER_REMOVED: &str = "FinalizerRemoved";
    /// Metrics exporter resources applied or removed
    pub const EXPORTER_RECONCILED: &str = "ExporterReconciled";
    /// Spec validation failed
    pub const VALIDATION_FAILED: &str = "ValidationFailed";
}

/// Event actions
pub mod actions {
    /// Standard reconciliation loop
    pub const RECONCILE: &str = "Reconcile";
    /// Deletion cleanup
    pub const FINALIZE: &str = "Finalize";
}
