//! Grant reconciliation
//!
//! A live Grant gets the revoke finalizer and a `GRANT` statement; a Grant
//! marked for deletion is handed to the [`FinalizationCoordinator`].

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use mariadb_common::crd::{is_ready, set_condition, Condition, Grant, GrantStatus};
use mariadb_common::events::{actions, reasons, EventPublisher, KubeEventPublisher};
use mariadb_common::{default_error_policy, Error, Result};
use mariadb_sql::{KubeSqlConnector, SqlConnector};

use crate::finalizer::FinalizationCoordinator;
use crate::kube_client::{GrantKubeClient, GrantKubeClientImpl};
use crate::poll::PollConfig;

/// Re-apply interval for a healthy Grant
const RESYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Controller name reported on Kubernetes Events
const CONTROLLER_NAME: &str = "grant-controller";

/// Controller context for Grant reconciliation
///
/// Use [`ContextBuilder`] to construct instances:
///
/// ```text
/// let ctx = Context::builder(client)
///     .poll_config(PollConfig::from_millis(1000, 5000))
///     .cancellation(shutdown.clone())
///     .build();
/// ```
pub struct Context {
    /// Kubernetes operations on Grants and Users
    pub kube: Arc<dyn GrantKubeClient>,
    /// Opens database connections for a Grant
    pub sql: Arc<dyn SqlConnector>,
    /// Event publisher for Grant events
    pub events: Arc<dyn EventPublisher>,
    /// Finalizer state machine sharing the clients above
    pub coordinator: FinalizationCoordinator,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(client: Client) -> ContextBuilder {
        ContextBuilder::new(client)
    }

    /// Create a context for testing with custom mock clients
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn GrantKubeClient>, sql: Arc<dyn SqlConnector>) -> Self {
        Self::assemble(
            kube,
            sql,
            Arc::new(mariadb_common::events::NoopEventPublisher),
            PollConfig::default(),
            CancellationToken::new(),
        )
    }

    fn assemble(
        kube: Arc<dyn GrantKubeClient>,
        sql: Arc<dyn SqlConnector>,
        events: Arc<dyn EventPublisher>,
        poll: PollConfig,
        cancel: CancellationToken,
    ) -> Self {
        let coordinator =
            FinalizationCoordinator::new(kube.clone(), sql.clone(), events.clone(), poll, cancel);
        Self {
            kube,
            sql,
            events,
            coordinator,
        }
    }
}

/// Builder for constructing [`Context`] instances
pub struct ContextBuilder {
    client: Client,
    kube: Option<Arc<dyn GrantKubeClient>>,
    sql: Option<Arc<dyn SqlConnector>>,
    events: Option<Arc<dyn EventPublisher>>,
    poll: PollConfig,
    cancel: Option<CancellationToken>,
}

impl ContextBuilder {
    fn new(client: Client) -> Self {
        Self {
            client,
            kube: None,
            sql: None,
            events: None,
            poll: PollConfig::default(),
            cancel: None,
        }
    }

    /// Override the Kubernetes client (primarily for testing)
    pub fn kube_client(mut self, kube: Arc<dyn GrantKubeClient>) -> Self {
        self.kube = Some(kube);
        self
    }

    /// Override the SQL connector (primarily for testing)
    pub fn sql_connector(mut self, sql: Arc<dyn SqlConnector>) -> Self {
        self.sql = Some(sql);
        self
    }

    /// Override the event publisher
    pub fn event_publisher(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Set the User existence poll used during finalization
    pub fn poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Token that aborts in-flight finalizer polls on shutdown
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        let kube = self
            .kube
            .unwrap_or_else(|| Arc::new(GrantKubeClientImpl::new(self.client.clone())));
        let sql = self
            .sql
            .unwrap_or_else(|| Arc::new(KubeSqlConnector::new(self.client.clone())));
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(KubeEventPublisher::new(self.client, CONTROLLER_NAME)));
        Context::assemble(kube, sql, events, self.poll, self.cancel.unwrap_or_default())
    }
}

/// Reconcile a Grant
///
/// Deletion runs the finalizer and then waits for the object to disappear.
/// A live Grant is validated, gets the finalizer and is applied. The `Ready`
/// condition records the outcome either way.
#[instrument(skip(grant, ctx), fields(grant = %grant.key()))]
pub async fn reconcile(grant: Arc<Grant>, ctx: Arc<Context>) -> Result<Action> {
    if grant.is_being_deleted() {
        let outcome = ctx.coordinator.finalize(&grant).await?;
        debug!(?outcome, "Finalization complete");
        return Ok(Action::await_change());
    }

    if let Err(e) = validate(&grant) {
        warn!(error = %e, "Invalid Grant");
        mark_not_ready(&grant, &ctx, reasons::VALIDATION_FAILED, &e.to_string()).await;
        return Err(e);
    }

    ctx.coordinator.attach(&grant).await?;

    if let Err(e) = apply(&grant, &ctx).await {
        warn!(error = %e, "Grant failed");
        mark_not_ready(&grant, &ctx, reasons::GRANT_FAILED, &e.to_string()).await;
        return Err(e);
    }

    let was_ready = grant
        .status
        .as_ref()
        .is_some_and(|s| is_ready(&s.conditions));
    let mut status = grant.status.clone().unwrap_or_default();
    set_condition(
        &mut status.conditions,
        Condition::ready(reasons::GRANT_APPLIED, "Privileges granted"),
    );
    ctx.kube.patch_status(&grant, &status).await?;

    if !was_ready {
        info!(username = %grant.spec.username, "Grant applied");
        publish(
            &grant,
            &ctx,
            EventType::Normal,
            reasons::GRANT_APPLIED,
            format!("Privileges granted to {}", grant.spec.username),
        )
        .await;
    }

    Ok(Action::requeue(RESYNC_INTERVAL))
}

/// Error policy for the Grant controller
pub fn error_policy(grant: Arc<Grant>, error: &Error, ctx: Arc<Context>) -> Action {
    default_error_policy(grant, error, ctx)
}

fn validate(grant: &Grant) -> Result<()> {
    let key = grant.key();
    if grant.spec.username.trim().is_empty() {
        return Err(Error::validation_for(key, "spec.username must not be empty"));
    }
    if grant.spec.privileges.iter().all(|p| p.trim().is_empty()) {
        return Err(Error::validation_for(key, "spec.privileges must not be empty"));
    }
    Ok(())
}

async fn apply(grant: &Grant, ctx: &Context) -> Result<()> {
    let key = grant.key();
    let client = ctx
        .sql
        .connect(grant)
        .await
        .map_err(|e| Error::external_effect(&key, e))?;
    let result = client.grant(&grant.descriptor()).await;
    client.close().await;
    result.map_err(|e| Error::external_effect(&key, e))
}

/// Record Ready=False. The reconcile error is what gets returned, so a
/// failed status patch is only logged.
async fn mark_not_ready(grant: &Grant, ctx: &Context, reason: &str, message: &str) {
    let mut status: GrantStatus = grant.status.clone().unwrap_or_default();
    set_condition(&mut status.conditions, Condition::not_ready(reason, message));
    if let Err(e) = ctx.kube.patch_status(grant, &status).await {
        warn!(error = %e, reason, "Failed to record Ready=False");
    }
    publish(grant, ctx, EventType::Warning, reason, message.to_string()).await;
}

async fn publish(grant: &Grant, ctx: &Context, type_: EventType, reason: &str, note: String) {
    ctx.events
        .publish(
            &grant.object_ref(&()),
            type_,
            reason,
            actions::RECONCILE,
            Some(note),
        )
        .await;
}
