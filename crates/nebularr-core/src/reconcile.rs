// ── Reconcile orchestrator ──
//
// Drives one managed object through
//
//   Connecting → Discovering → ReadingState → Diffing → Applying → Reporting
//
// and folds the outcome into its status. A pass never fails: every error
// ends up as a `Failed` status with a requeue delay.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use strum::Display;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::adapter::{Adapter, Registry, ServiceInfo};
use crate::capabilities::Capabilities;
use crate::changeset::{ApplyResult, ChangeSet};
use crate::context::Context;
use crate::diff;
use crate::error::{AdapterError, ReconcileError};
use crate::ir::IR;
use crate::object::ManagedObject;
use crate::ownership::ManagedResources;
use crate::registration;
use crate::retry::{Backoff, RetryPolicy};
use crate::status::{ConditionStatus, ConditionType, ObjectStatus, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Resync interval of a healthy object.
    pub period: Duration,
    /// Upper bound on one pass.
    pub deadline: Duration,
    pub read_retry: RetryPolicy,
    pub backoff: Backoff,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(300),
            deadline: Duration::from_secs(300),
            read_retry: RetryPolicy::default(),
            backoff: Backoff::default(),
        }
    }
}

/// Why an object is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Trigger {
    GenerationChanged,
    RetryDue,
    Drift,
    Periodic,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub status: ObjectStatus,
    /// Terminal phase of the pass.
    pub phase: Phase,
    /// `None` for suspended objects.
    pub requeue_after: Option<Duration>,
    pub changes: Option<ChangeSet>,
    pub result: Option<ApplyResult>,
}

impl ReconcileOutcome {
    /// Outcome for a pass whose task panicked.
    pub fn panicked(previous: ObjectStatus, object: &ManagedObject, message: String, settings: &ReconcileSettings) -> Self {
        let mut status = previous;
        let err = ReconcileError::Panicked(message);
        let requeue = record_failure(&mut status, object, &err, settings, Utc::now());
        Self {
            status,
            phase: Phase::Failed,
            requeue_after: Some(requeue),
            changes: None,
            result: None,
        }
    }
}

/// Live state and the changes a reconcile would make.
#[derive(Debug, Clone)]
pub struct Plan {
    pub service: ServiceInfo,
    pub capabilities: Capabilities,
    pub current: IR,
    pub changes: ChangeSet,
}

struct Applied {
    changes: Option<ChangeSet>,
    result: ApplyResult,
    hash: String,
}

fn enter(phase: Phase) {
    debug!(%phase, "entering phase");
}

fn at(phase: Phase) -> impl FnOnce(AdapterError) -> ReconcileError {
    move |source| ReconcileError::Phase { phase, source }
}

fn after(now: DateTime<Utc>, delay: Duration) -> Option<DateTime<Utc>> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
}

/// Fold a failed pass into `status`; returns the requeue delay.
fn record_failure(
    status: &mut ObjectStatus,
    object: &ManagedObject,
    err: &ReconcileError,
    settings: &ReconcileSettings,
    now: DateTime<Utc>,
) -> Duration {
    status.consecutive_failures = status.consecutive_failures.saturating_add(1);
    status.observed_generation = Some(object.generation);
    status.phase = Some(Phase::Failed);
    let delay = if err.backs_off() {
        settings.backoff.delay(status.consecutive_failures)
    } else {
        settings.period
    };
    status.next_retry = after(now, delay);
    if let ReconcileError::Phase {
        phase: Phase::Connecting,
        source,
    } = err
    {
        status.set_condition(
            ConditionType::Connected,
            ConditionStatus::False,
            "ConnectFailed",
            source.to_string(),
            now,
        );
    }
    status.set_condition(
        ConditionType::Ready,
        ConditionStatus::False,
        err.reason(),
        err.to_string(),
        now,
    );
    delay
}

fn summary(result: &ApplyResult) -> String {
    if result.total() == 0 {
        return "in sync".into();
    }
    format!("applied {}, skipped {}", result.applied, result.skipped)
}

fn degraded_message(result: &ApplyResult) -> String {
    if result.interrupted && result.failed == 0 {
        return format!(
            "interrupted after {} of {} changes",
            result.applied,
            result.total()
        );
    }
    let causes: Vec<String> = result
        .errors
        .iter()
        .take(3)
        .map(|e| format!("{}: {}", e.resource, e.cause))
        .collect();
    format!(
        "{} of {} changes failed: {}",
        result.failed,
        result.total(),
        causes.join("; ")
    )
}

/// Whether `object` is due for a reconcile at `now`, and why.
///
/// A new generation is due at once. Otherwise a pending retry waits for its
/// time, and a settled object is due on drift or after `period`.
pub fn needs_reconcile(
    object: &ManagedObject,
    status: &ObjectStatus,
    now: DateTime<Utc>,
    period: Duration,
) -> Option<Trigger> {
    if object.suspend {
        return None;
    }
    if status.observed_generation != Some(object.generation) {
        return Some(Trigger::GenerationChanged);
    }
    if let Some(at) = status.next_retry {
        return (now >= at).then_some(Trigger::RetryDue);
    }
    if object.fingerprint().ok() != status.last_applied_hash {
        return Some(Trigger::Drift);
    }
    match status.last_reconcile {
        Some(last) if after(last, period).is_some_and(|due| now < due) => None,
        _ => Some(Trigger::Periodic),
    }
}

/// Runs reconciles with a shared adapter registry.
#[derive(Debug, Clone)]
pub struct Reconciler {
    registry: Arc<Registry>,
    settings: ReconcileSettings,
}

impl Reconciler {
    pub fn new(registry: Arc<Registry>, settings: ReconcileSettings) -> Self {
        Self { registry, settings }
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn adapter(&self, object: &ManagedObject) -> Result<Arc<dyn Adapter>, ReconcileError> {
        self.registry
            .get(object.backend)
            .ok_or(ReconcileError::NoAdapter(object.backend))
    }

    /// Retried read-only call within one phase.
    async fn read<T, F, Fut>(&self, ctx: &Context, phase: Phase, op: F) -> Result<T, ReconcileError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AdapterError>>,
    {
        enter(phase);
        let name = phase.to_string();
        self.settings
            .read_retry
            .run(ctx, &name, op)
            .await
            .map_err(at(phase))
    }

    /// One reconcile pass from `previous` to the returned status.
    pub async fn reconcile(&self, ctx: &Context, object: &ManagedObject, previous: ObjectStatus) -> ReconcileOutcome {
        let span = info_span!(
            "reconcile",
            object = %object.name,
            backend = %object.backend,
            generation = object.generation
        );
        self.reconcile_pass(ctx, object, previous)
            .instrument(span)
            .await
    }

    async fn reconcile_pass(&self, ctx: &Context, object: &ManagedObject, previous: ObjectStatus) -> ReconcileOutcome {
        let mut status = previous;
        status.last_attempt = Some(Utc::now());

        if object.suspend {
            info!("suspended, skipping");
            status.phase = Some(Phase::Suspended);
            status.next_retry = None;
            status.set_condition(
                ConditionType::Ready,
                ConditionStatus::Unknown,
                "Suspended",
                "reconciliation is suspended",
                Utc::now(),
            );
            return ReconcileOutcome {
                status,
                phase: Phase::Suspended,
                requeue_after: None,
                changes: None,
                result: None,
            };
        }

        let ctx = ctx.child_with_timeout(self.settings.deadline);
        let outcome = match self.adapter(object) {
            Ok(adapter) => {
                let outcome = self.run(&ctx, adapter.as_ref(), object, &mut status).await;
                if outcome.is_ok() {
                    self.report(&ctx, adapter.as_ref(), object, &mut status).await;
                }
                outcome
            }
            Err(e) => Err(e),
        };

        let now = Utc::now();
        match outcome {
            Ok(applied) if applied.result.is_success() => {
                info!(
                    applied = applied.result.applied,
                    skipped = applied.result.skipped,
                    "reconciled"
                );
                status.phase = Some(Phase::Ready);
                status.observed_generation = Some(object.generation);
                status.last_applied_hash = Some(applied.hash);
                status.last_reconcile = Some(now);
                status.consecutive_failures = 0;
                status.next_retry = None;
                status.set_condition(
                    ConditionType::Ready,
                    ConditionStatus::True,
                    "ReconcileSucceeded",
                    summary(&applied.result),
                    now,
                );
                ReconcileOutcome {
                    status,
                    phase: Phase::Ready,
                    requeue_after: Some(self.settings.period),
                    changes: applied.changes,
                    result: Some(applied.result),
                }
            }
            Ok(applied) => {
                warn!(
                    applied = applied.result.applied,
                    failed = applied.result.failed,
                    "reconciled with failures"
                );
                status.phase = Some(Phase::Degraded);
                status.observed_generation = Some(object.generation);
                status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                let delay = self.settings.backoff.delay(status.consecutive_failures);
                status.next_retry = after(now, delay);
                status.set_condition(
                    ConditionType::Ready,
                    ConditionStatus::False,
                    "PartialApply",
                    degraded_message(&applied.result),
                    now,
                );
                ReconcileOutcome {
                    status,
                    phase: Phase::Degraded,
                    requeue_after: Some(delay),
                    changes: applied.changes,
                    result: Some(applied.result),
                }
            }
            Err(err) => {
                warn!(error = %err, reason = err.reason(), "reconcile failed");
                let delay = record_failure(&mut status, object, &err, &self.settings, now);
                ReconcileOutcome {
                    status,
                    phase: Phase::Failed,
                    requeue_after: Some(delay),
                    changes: None,
                    result: None,
                }
            }
        }
    }

    async fn run(
        &self,
        ctx: &Context,
        adapter: &dyn Adapter,
        object: &ManagedObject,
        status: &mut ObjectStatus,
    ) -> Result<Applied, ReconcileError> {
        let conn = &object.connection;
        let hash = object.fingerprint().map_err(|e| ReconcileError::Phase {
            phase: Phase::Diffing,
            source: AdapterError::Protocol {
                message: e.to_string(),
            },
        })?;

        let service = self
            .read(ctx, Phase::Connecting, || adapter.connect(ctx, conn))
            .await?;
        status.set_condition(
            ConditionType::Connected,
            ConditionStatus::True,
            "Connected",
            format!("{} {}", object.backend, service.version),
            Utc::now(),
        );
        status.service_version = Some(service.version);

        let caps = self
            .read(ctx, Phase::Discovering, || adapter.discover(ctx, conn))
            .await?;

        if let Some(direct) = adapter.as_direct_applier() {
            enter(Phase::Diffing);
            let desired = diff::prepare(&object.desired)?;
            enter(Phase::Applying);
            let result = direct
                .apply_direct(ctx, conn, &desired)
                .await
                .map_err(at(Phase::Applying))?;
            return Ok(Applied {
                changes: None,
                result,
                hash,
            });
        }

        let owned = status.managed_resources.clone();
        let current = self
            .read(ctx, Phase::ReadingState, || {
                adapter.current_state(ctx, conn, &owned)
            })
            .await?;

        enter(Phase::Diffing);
        let changes = adapter.diff(&current, &object.desired, &caps, &owned)?;
        info!(
            creates = changes.creates.len(),
            updates = changes.updates.len(),
            deletes = changes.deletes.len(),
            "planned"
        );

        enter(Phase::Applying);
        let result = if changes.is_empty() {
            ApplyResult::default()
        } else {
            // Not raced against `ctx`: the executor stops between items and
            // hands back what it already wrote.
            adapter
                .apply(ctx, conn, &changes, &owned)
                .await
                .map_err(at(Phase::Applying))?
        };
        status.managed_resources.absorb(&result);

        Ok(Applied {
            changes: Some(changes),
            result,
            hash,
        })
    }

    /// Best-effort health and registration observation.
    async fn report(&self, ctx: &Context, adapter: &dyn Adapter, object: &ManagedObject, status: &mut ObjectStatus) {
        enter(Phase::Reporting);
        if let Some(reporter) = adapter.as_health_reporter() {
            let now = Utc::now();
            match ctx.run(reporter.health(ctx, &object.connection)).await {
                Ok(health) => {
                    let (reason, message) = if health.healthy {
                        ("HealthCheckPassed", format!("{} notices", health.issues.len()))
                    } else {
                        ("HealthIssues", format!("{} issues reported", health.issues.len()))
                    };
                    status.set_condition(
                        ConditionType::Healthy,
                        health.healthy.into(),
                        reason,
                        message,
                        now,
                    );
                    status.health = Some(health);
                }
                Err(e) => {
                    warn!(error = %e, "health check failed");
                    status.set_condition(
                        ConditionType::Healthy,
                        ConditionStatus::Unknown,
                        "HealthCheckFailed",
                        e.to_string(),
                        now,
                    );
                }
            }
        }
        status.prowlarr_registration = registration::observe(&self.registry, ctx, object).await;
    }

    /// Connect, read and diff without applying.
    pub async fn plan(&self, ctx: &Context, object: &ManagedObject, owned: &ManagedResources) -> Result<Plan, ReconcileError> {
        let adapter = self.adapter(object)?;
        let ctx = ctx.child_with_timeout(self.settings.deadline);
        let ctx = &ctx;
        let conn = &object.connection;

        let service = self
            .read(ctx, Phase::Connecting, || adapter.connect(ctx, conn))
            .await?;
        let capabilities = self
            .read(ctx, Phase::Discovering, || adapter.discover(ctx, conn))
            .await?;
        let current = self
            .read(ctx, Phase::ReadingState, || {
                adapter.current_state(ctx, conn, owned)
            })
            .await?;
        enter(Phase::Diffing);
        let changes = adapter.diff(&current, &object.desired, &capabilities, owned)?;
        Ok(Plan {
            service,
            capabilities,
            current,
            changes,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::adapter::BackendKind;
    use crate::connection::{ConnectionIR, Credential};
    use url::Url;

    fn object() -> ManagedObject {
        ManagedObject {
            name: "movies".into(),
            generation: 2,
            suspend: false,
            backend: BackendKind::Radarr,
            connection: ConnectionIR::new(Url::parse("http://radarr:7878").unwrap(), Credential::None),
            desired: IR::default(),
            prowlarr: None,
        }
    }

    fn settled(object: &ManagedObject, now: DateTime<Utc>) -> ObjectStatus {
        ObjectStatus {
            observed_generation: Some(object.generation),
            last_applied_hash: object.fingerprint().ok(),
            last_reconcile: Some(now),
            ..ObjectStatus::default()
        }
    }

    const PERIOD: Duration = Duration::from_secs(300);

    #[test]
    fn new_generation_is_due() {
        let o = object();
        let now = Utc::now();
        let mut status = settled(&o, now);
        status.observed_generation = Some(1);
        status.next_retry = after(now, Duration::from_secs(60));
        assert_eq!(
            needs_reconcile(&o, &status, now, PERIOD),
            Some(Trigger::GenerationChanged)
        );
    }

    #[test]
    fn pending_retry_waits() {
        let o = object();
        let now = Utc::now();
        let mut status = settled(&o, now);
        status.next_retry = after(now, Duration::from_secs(60));
        assert_eq!(needs_reconcile(&o, &status, now, PERIOD), None);
        let later = after(now, Duration::from_secs(61)).unwrap();
        assert_eq!(needs_reconcile(&o, &status, later, PERIOD), Some(Trigger::RetryDue));
    }

    #[test]
    fn drift_is_due_without_generation_change() {
        let o = object();
        let now = Utc::now();
        let mut status = settled(&o, now);
        status.last_applied_hash = Some("0000000000000000".into());
        assert_eq!(needs_reconcile(&o, &status, now, PERIOD), Some(Trigger::Drift));
    }

    #[test]
    fn settled_object_waits_for_period() {
        let o = object();
        let now = Utc::now();
        let status = settled(&o, now);
        assert_eq!(needs_reconcile(&o, &status, now, PERIOD), None);
        let later = after(now, PERIOD).unwrap();
        assert_eq!(needs_reconcile(&o, &status, later, PERIOD), Some(Trigger::Periodic));
    }

    #[test]
    fn suspended_object_is_never_due() {
        let mut o = object();
        o.suspend = true;
        assert_eq!(needs_reconcile(&o, &ObjectStatus::default(), Utc::now(), PERIOD), None);
    }

    #[test]
    fn panicked_outcome_backs_off() {
        let o = object();
        let outcome = ReconcileOutcome::panicked(
            ObjectStatus::default(),
            &o,
            "boom".into(),
            &ReconcileSettings::default(),
        );
        assert_eq!(outcome.phase, Phase::Failed);
        assert_eq!(outcome.status.consecutive_failures, 1);
        assert_eq!(outcome.requeue_after, Some(Duration::from_secs(5)));
        assert_eq!(
            outcome.status.condition(ConditionType::Ready).map(|c| c.reason.as_str()),
            Some("Panicked")
        );
    }
}
