// ── Worker pool ──
//
// Bounded concurrency across objects, strict serialization per object.
// Status is loaded only after the object's lock is held, so two passes over
// the same object never read the same previous status. The lock and the
// worker permit live on the pass's task: a caller that stops waiting does
// not release them before the status is saved.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::Context;
use crate::error::{PoolError, StoreError};
use crate::object::ManagedObject;
use crate::reconcile::{ReconcileOutcome, Reconciler, needs_reconcile};
use crate::status::ObjectStatus;

/// Where object statuses live between passes.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn load(&self, name: &str) -> Result<Option<ObjectStatus>, StoreError>;

    async fn save(&self, name: &str, status: &ObjectStatus) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    statuses: DashMap<String, ObjectStatus>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn load(&self, name: &str) -> Result<Option<ObjectStatus>, StoreError> {
        Ok(self.statuses.get(name).map(|s| s.value().clone()))
    }

    async fn save(&self, name: &str, status: &ObjectStatus) -> Result<(), StoreError> {
        self.statuses.insert(name.to_owned(), status.clone());
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}

/// One owned pass over an object.
struct Pass {
    reconciler: Arc<Reconciler>,
    store: Arc<dyn StatusStore>,
    lock: Arc<Mutex<()>>,
    permits: Arc<Semaphore>,
    ctx: Context,
    object: ManagedObject,
}

impl Pass {
    async fn run(self) -> Result<ReconcileOutcome, PoolError> {
        let Self {
            reconciler,
            store,
            lock,
            permits,
            ctx,
            object,
        } = self;
        let _serial = lock.lock_owned().await;
        let _permit = permits.acquire_owned().await.map_err(|_| PoolError::Closed)?;

        let previous = store.load(&object.name).await?.unwrap_or_default();

        let task_reconciler = Arc::clone(&reconciler);
        let task_object = object.clone();
        let task_previous = previous.clone();
        let handle = tokio::spawn(async move {
            task_reconciler
                .reconcile(&ctx, &task_object, task_previous)
                .await
        });

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = if e.is_panic() {
                    panic_message(e.into_panic().as_ref())
                } else {
                    "reconcile task was cancelled".into()
                };
                error!(object = %object.name, %message, "reconcile task died");
                ReconcileOutcome::panicked(previous, &object, message, reconciler.settings())
            }
        };

        store.save(&object.name, &outcome.status).await?;
        Ok(outcome)
    }
}

pub struct ReconcilePool {
    reconciler: Arc<Reconciler>,
    store: Arc<dyn StatusStore>,
    permits: Arc<Semaphore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ReconcilePool {
    pub fn new(reconciler: Arc<Reconciler>, store: Arc<dyn StatusStore>, workers: usize) -> Self {
        Self {
            reconciler,
            store,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            locks: DashMap::new(),
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks.entry(name.to_owned()).or_default().clone()
    }

    /// Reconcile one object and persist its new status. The pass runs on
    /// its own task; a panic there becomes a `Failed` status. Dropping the
    /// returned future detaches the pass, which still finishes and saves
    /// before the object's next pass can start.
    pub async fn reconcile(&self, ctx: &Context, object: &ManagedObject) -> Result<ReconcileOutcome, PoolError> {
        let pass = Pass {
            reconciler: Arc::clone(&self.reconciler),
            store: Arc::clone(&self.store),
            lock: self.lock_for(&object.name),
            permits: Arc::clone(&self.permits),
            ctx: ctx.clone(),
            object: object.clone(),
        };
        match tokio::spawn(pass.run()).await {
            Ok(result) => result,
            Err(e) => {
                error!(object = %object.name, error = %e, "pool pass task died");
                Err(PoolError::Closed)
            }
        }
    }

    /// Reconcile every object concurrently. Results are sorted by name.
    pub async fn reconcile_all(
        self: &Arc<Self>,
        ctx: &Context,
        objects: &[ManagedObject],
    ) -> Vec<(String, Result<ReconcileOutcome, PoolError>)> {
        let mut tasks = JoinSet::new();
        for object in objects {
            let pool = Arc::clone(self);
            let ctx = ctx.clone();
            let object = object.clone();
            tasks.spawn(async move {
                let result = pool.reconcile(&ctx, &object).await;
                (object.name, result)
            });
        }

        let mut out = Vec::with_capacity(objects.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => out.push(entry),
                Err(e) => error!(error = %e, "pool task failed"),
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Reconcile due objects every `tick` until `ctx` is cancelled.
    pub async fn watch(
        self: &Arc<Self>,
        ctx: &Context,
        objects: &[ManagedObject],
        tick: Duration,
    ) -> Result<(), PoolError> {
        info!(objects = objects.len(), ?tick, "watching");
        let period = self.reconciler.settings().period;
        loop {
            if ctx.is_cancelled() {
                return Ok(());
            }

            let now = Utc::now();
            let mut due = Vec::new();
            for object in objects {
                let status = self.store.load(&object.name).await?.unwrap_or_default();
                if let Some(trigger) = needs_reconcile(object, &status, now, period) {
                    debug!(object = %object.name, %trigger, "due");
                    due.push(object.clone());
                }
            }

            for (name, result) in self.reconcile_all(ctx, &due).await {
                if let Err(e) = result {
                    warn!(object = %name, error = %e, "status not recorded");
                }
            }

            tokio::select! {
                () = ctx.token().cancelled() => return Ok(()),
                () = tokio::time::sleep(tick) => {}
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryStatusStore::new();
        assert!(store.load("a").await.unwrap().is_none());
        let status = ObjectStatus {
            consecutive_failures: 2,
            ..ObjectStatus::default()
        };
        store.save("a", &status).await.unwrap();
        assert_eq!(store.load("a").await.unwrap(), Some(status));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let s: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(s.as_ref()), "boom");
        let s: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(s.as_ref()), "bang");
        let s: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(s.as_ref()), "unknown panic");
    }
}
