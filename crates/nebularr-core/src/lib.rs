// nebularr-core: Reconciliation engine between declarative desired state and
// the Servarr family (plus file-rendered backends).

pub mod adapter;
pub mod apply;
pub mod capabilities;
pub mod changeset;
pub mod connection;
pub mod context;
pub mod diff;
pub mod drift;
pub mod error;
pub mod ir;
pub mod object;
pub mod ownership;
pub mod pool;
pub mod preset;
pub mod reconcile;
pub mod registration;
pub mod retry;
pub mod status;
pub mod tier;

// ── Primary re-exports ──────────────────────────────────────────────
pub use adapter::{
    Adapter, BackendKind, DirectApplier, FileAdapter, HealthReporter, HealthStatus,
    RegistrationSource, Registry, ServarrAdapter, ServiceInfo,
};
pub use capabilities::Capabilities;
pub use changeset::{ApplyResult, ChangeSet, Resource, ResourceKey, ResourceKind, ResourceRef};
pub use connection::{ConnectionIR, Credential, TlsVerification};
pub use context::Context;
pub use error::{AdapterError, DiffError, PoolError, ReconcileError, StoreError};
pub use ir::IR;
pub use object::{ManagedObject, ProwlarrRef};
pub use ownership::{MANAGED_PREFIX, ManagedResources};
pub use pool::{MemoryStatusStore, ReconcilePool, StatusStore};
pub use reconcile::{Plan, ReconcileOutcome, ReconcileSettings, Reconciler, Trigger, needs_reconcile};
pub use retry::{Backoff, RetryPolicy};
pub use status::{Condition, ConditionStatus, ConditionType, ObjectStatus, Phase, ProwlarrRegistration};
pub use tier::{MediaKind, Tier};
