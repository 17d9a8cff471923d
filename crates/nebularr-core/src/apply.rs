// ── Apply executor ──
//
// Drives a `ResourceWriter` through a change set: creates, then updates,
// then deletes. Items are independent; a failed item is recorded and the
// rest still run. Nothing here retries.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::changeset::{ApplyItemError, ApplyResult, ChangeSet, Resource, ResourceRef};
use crate::context::Context;
use crate::error::AdapterError;
use crate::ownership::ManagedResources;

/// Per-item write operations of one backend.
#[async_trait]
pub trait ResourceWriter: Send {
    /// Session setup or probe. Failing here fails the whole apply.
    async fn begin(&mut self, _ctx: &Context) -> Result<(), AdapterError> {
        Ok(())
    }

    /// Create `resource`; returns the new backend ID when there is one.
    async fn create(&mut self, ctx: &Context, resource: &Resource)
    -> Result<Option<i64>, AdapterError>;

    async fn update(&mut self, ctx: &Context, resource: &Resource) -> Result<(), AdapterError>;

    async fn delete(&mut self, ctx: &Context, target: &ResourceRef) -> Result<(), AdapterError>;
}

fn owned_for_write(owned: &ManagedResources, resource: &ResourceRef, name: Option<&str>) -> bool {
    owned.owns(resource.kind, name, resource.id)
}

/// Apply `changes` through `writer`.
///
/// Updates and deletes whose target is not provably owned are skipped, as
/// is everything left once the context is done; the latter marks the
/// result interrupted. Items already written stay in `recorded` and
/// `released` either way. A delete that finds nothing counts as applied.
pub async fn execute<W>(
    ctx: &Context,
    writer: &mut W,
    changes: &ChangeSet,
    owned: &ManagedResources,
) -> Result<ApplyResult, AdapterError>
where
    W: ResourceWriter + ?Sized,
{
    ctx.run(writer.begin(ctx)).await?;

    let mut result = ApplyResult::default();

    for resource in &changes.creates {
        if ctx.is_done() {
            result.skipped += 1;
            result.interrupted = true;
            continue;
        }
        match ctx.run(writer.create(ctx, resource)).await {
            Ok(id) => {
                info!(kind = %resource.kind, key = %resource.key, ?id, "created");
                result.applied += 1;
                if let Some(id) = id {
                    result.recorded.push(ResourceRef {
                        kind: resource.kind,
                        key: resource.key.clone(),
                        id: Some(id),
                    });
                }
            }
            Err(e) => fail(&mut result, resource.to_ref(), &e),
        }
    }

    for resource in &changes.updates {
        let target = resource.to_ref();
        if !owned_for_write(owned, &target, resource.name()) {
            debug!(%target, "skipping update of unowned resource");
            result.skipped += 1;
            continue;
        }
        if ctx.is_done() {
            result.skipped += 1;
            result.interrupted = true;
            continue;
        }
        match ctx.run(writer.update(ctx, resource)).await {
            Ok(()) => {
                info!(kind = %resource.kind, key = %resource.key, "updated");
                result.applied += 1;
            }
            Err(e) => fail(&mut result, target, &e),
        }
    }

    for target in &changes.deletes {
        if target.kind.is_singleton() || !owned_for_write(owned, target, target.key.as_name()) {
            debug!(%target, "skipping delete of unowned resource");
            result.skipped += 1;
            continue;
        }
        if ctx.is_done() {
            result.skipped += 1;
            result.interrupted = true;
            continue;
        }
        match ctx.run(writer.delete(ctx, target)).await {
            Ok(()) => {
                info!(kind = %target.kind, key = %target.key, "deleted");
                result.applied += 1;
                result.released.push(target.clone());
            }
            Err(e) if e.is_not_found() => {
                debug!(%target, "already gone");
                result.applied += 1;
                result.released.push(target.clone());
            }
            Err(e) => fail(&mut result, target.clone(), &e),
        }
    }

    Ok(result)
}

fn fail(result: &mut ApplyResult, resource: ResourceRef, err: &AdapterError) {
    warn!(%resource, error = %err, "apply item failed");
    result.failed += 1;
    result.errors.push(ApplyItemError {
        resource,
        cause: err.to_string(),
    });
}
