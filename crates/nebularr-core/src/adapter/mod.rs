// ── Adapter contract ──
//
// One adapter per backend kind, looked up through the `Registry`. Adapters
// are stateless: the connection and the ownership record travel with every
// call. Optional capabilities are exposed through the `as_*` accessors so
// the orchestrator can probe a `dyn Adapter` for them.

pub mod convert;
pub mod file;
pub mod servarr;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use url::Url;

use crate::capabilities::Capabilities;
use crate::changeset::{ApplyResult, ChangeSet};
use crate::connection::ConnectionIR;
use crate::context::Context;
use crate::diff;
use crate::error::{AdapterError, DiffError};
use crate::ir::IR;
use crate::ownership::ManagedResources;

pub use file::FileAdapter;
pub use servarr::ServarrAdapter;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    Radarr,
    Sonarr,
    Lidarr,
    Prowlarr,
    File,
}

/// Result of a liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthIssue {
    pub source: String,
    /// `notice`, `warning` or `error`.
    pub severity: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<HealthIssue>,
}

/// A downstream application as registered on an indexer aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredApplication {
    pub id: i64,
    pub name: String,
    pub sync_level: Option<String>,
    pub synced_indexers: usize,
}

#[async_trait]
pub trait Adapter: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Liveness and version probe. Never mutates.
    async fn connect(&self, ctx: &Context, conn: &ConnectionIR)
    -> Result<ServiceInfo, AdapterError>;

    /// Fresh capability snapshot.
    async fn discover(
        &self,
        ctx: &Context,
        conn: &ConnectionIR,
    ) -> Result<Capabilities, AdapterError>;

    /// Owned resources plus the settings singletons.
    async fn current_state(
        &self,
        ctx: &Context,
        conn: &ConnectionIR,
        owned: &ManagedResources,
    ) -> Result<IR, AdapterError>;

    fn diff(
        &self,
        current: &IR,
        desired: &IR,
        caps: &Capabilities,
        owned: &ManagedResources,
    ) -> Result<ChangeSet, DiffError> {
        diff::diff(current, desired, caps, owned)
    }

    /// Best-effort apply. Item failures land in the result; an error means
    /// no item was attempted.
    async fn apply(
        &self,
        ctx: &Context,
        conn: &ConnectionIR,
        changes: &ChangeSet,
        owned: &ManagedResources,
    ) -> Result<ApplyResult, AdapterError>;

    fn as_direct_applier(&self) -> Option<&dyn DirectApplier> {
        None
    }

    fn as_health_reporter(&self) -> Option<&dyn HealthReporter> {
        None
    }

    fn as_registration_source(&self) -> Option<&dyn RegistrationSource> {
        None
    }
}

/// Whole-replace backends: write the full desired state in one step.
#[async_trait]
pub trait DirectApplier: Send + Sync {
    async fn apply_direct(
        &self,
        ctx: &Context,
        conn: &ConnectionIR,
        desired: &IR,
    ) -> Result<ApplyResult, AdapterError>;
}

#[async_trait]
pub trait HealthReporter: Send + Sync {
    async fn health(&self, ctx: &Context, conn: &ConnectionIR)
    -> Result<HealthStatus, AdapterError>;
}

/// Indexer aggregators that downstream applications register with.
#[async_trait]
pub trait RegistrationSource: Send + Sync {
    /// The application whose base URL is `app_url`, if registered.
    async fn registered_application(
        &self,
        ctx: &Context,
        conn: &ConnectionIR,
        app_url: &Url,
    ) -> Result<Option<RegisteredApplication>, AdapterError>;
}

// ── Registry ─────────────────────────────────────────────────────────

/// Adapters by backend kind.
#[derive(Clone, Default)]
pub struct Registry {
    adapters: HashMap<BackendKind, Arc<dyn Adapter>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in adapter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in [
            BackendKind::Radarr,
            BackendKind::Sonarr,
            BackendKind::Lidarr,
            BackendKind::Prowlarr,
        ] {
            if let Some(adapter) = ServarrAdapter::new(kind) {
                registry.register(Arc::new(adapter));
            }
        }
        registry.register(Arc::new(FileAdapter));
        registry
    }

    /// Register `adapter` under its own backend kind, replacing any previous.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(adapter.backend(), adapter);
    }

    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(&kind).cloned()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<String> = self.adapters.keys().map(ToString::to_string).collect();
        kinds.sort();
        f.debug_struct("Registry").field("adapters", &kinds).finish()
    }
}
