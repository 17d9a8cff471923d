// Orchestrator and worker-pool tests against an in-memory backend.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;

use nebularr_core::adapter::{HealthIssue, RegisteredApplication};
use nebularr_core::apply::{self, ResourceWriter};
use nebularr_core::ir::{DownloadClientIR, QualityIR};
use nebularr_core::tier::Resolution;
use nebularr_core::{
    Adapter, AdapterError, ApplyResult, BackendKind, Capabilities, ChangeSet, ConditionStatus,
    ConditionType, ConnectionIR, Context, Credential, HealthReporter, HealthStatus, IR,
    ManagedObject, ManagedResources, MemoryStatusStore, ObjectStatus, Phase, ProwlarrRef,
    ReconcilePool, ReconcileSettings, Reconciler, RegistrationSource, Registry, Resource,
    ResourceKey, ResourceKind, ResourceRef, RetryPolicy, ServiceInfo, StatusStore,
};

// ── Fake backend ────────────────────────────────────────────────────

struct Fake {
    live: Mutex<IR>,
    caps: Capabilities,
    fail_connect: bool,
    panic_connect: bool,
    fail_names: Vec<String>,
    unhealthy: bool,
    connect_delay: Duration,
    create_delay: Duration,
    next_id: AtomicI64,
    connects: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Fake {
    fn new() -> Self {
        Self {
            live: Mutex::new(IR::default()),
            caps: Capabilities::unrestricted(Utc::now()),
            fail_connect: false,
            panic_connect: false,
            fail_names: Vec::new(),
            unhealthy: false,
            connect_delay: Duration::ZERO,
            create_delay: Duration::ZERO,
            next_id: AtomicI64::new(100),
            connects: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn live(&self) -> IR {
        self.live.lock().unwrap().clone()
    }
}

#[async_trait]
impl Adapter for Fake {
    fn backend(&self) -> BackendKind {
        BackendKind::Radarr
    }

    async fn connect(&self, _ctx: &Context, _conn: &ConnectionIR) -> Result<ServiceInfo, AdapterError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        assert!(!self.panic_connect, "adapter exploded");
        if self.fail_connect {
            return Err(AdapterError::Unreachable {
                url: "http://fake".into(),
                reason: "connection refused".into(),
            });
        }
        Ok(ServiceInfo {
            version: "5.0.0".into(),
            start_time: None,
        })
    }

    async fn discover(&self, _ctx: &Context, _conn: &ConnectionIR) -> Result<Capabilities, AdapterError> {
        Ok(self.caps.clone())
    }

    async fn current_state(
        &self,
        _ctx: &Context,
        _conn: &ConnectionIR,
        owned: &ManagedResources,
    ) -> Result<IR, AdapterError> {
        let live = self.live();
        Ok(IR {
            quality_profile: live
                .quality_profile
                .filter(|q| owned.owns(ResourceKind::QualityProfile, Some(&q.name), q.id)),
            download_clients: live
                .download_clients
                .into_iter()
                .filter(|dc| owned.owns(ResourceKind::DownloadClient, Some(&dc.name), dc.id))
                .collect(),
            ..IR::default()
        })
    }

    async fn apply(
        &self,
        ctx: &Context,
        _conn: &ConnectionIR,
        changes: &ChangeSet,
        owned: &ManagedResources,
    ) -> Result<ApplyResult, AdapterError> {
        apply::execute(ctx, &mut MemWriter { fake: self }, changes, owned).await
    }

    fn as_health_reporter(&self) -> Option<&dyn HealthReporter> {
        Some(self)
    }
}

#[async_trait]
impl HealthReporter for Fake {
    async fn health(&self, _ctx: &Context, _conn: &ConnectionIR) -> Result<HealthStatus, AdapterError> {
        let issues = if self.unhealthy {
            vec![HealthIssue {
                source: "IndexerStatusCheck".into(),
                severity: "error".into(),
                message: "All indexers are unavailable".into(),
            }]
        } else {
            Vec::new()
        };
        Ok(HealthStatus {
            healthy: !self.unhealthy,
            issues,
        })
    }
}

struct MemWriter<'a> {
    fake: &'a Fake,
}

#[async_trait]
impl ResourceWriter for MemWriter<'_> {
    async fn create(&mut self, _ctx: &Context, resource: &Resource) -> Result<Option<i64>, AdapterError> {
        if self
            .fake
            .fail_names
            .iter()
            .any(|n| Some(n.as_str()) == resource.name())
        {
            return Err(AdapterError::Rejected {
                status: 400,
                message: "validation failed".into(),
            });
        }
        if !self.fake.create_delay.is_zero() {
            tokio::time::sleep(self.fake.create_delay).await;
        }
        let id = self.fake.next_id.fetch_add(1, Ordering::SeqCst);
        let mut live = self.fake.live.lock().unwrap();
        match resource.kind {
            ResourceKind::DownloadClient => {
                let mut dc: DownloadClientIR = serde_json::from_value(resource.payload.clone()).unwrap();
                dc.id = Some(id);
                live.download_clients.push(dc);
            }
            ResourceKind::QualityProfile => {
                let mut q: QualityIR = serde_json::from_value(resource.payload.clone()).unwrap();
                q.id = Some(id);
                live.quality_profile = Some(q);
            }
            kind => {
                return Err(AdapterError::Unsupported {
                    operation: format!("create {kind}"),
                });
            }
        }
        Ok(Some(id))
    }

    async fn update(&mut self, _ctx: &Context, resource: &Resource) -> Result<(), AdapterError> {
        let mut live = self.fake.live.lock().unwrap();
        if resource.kind == ResourceKind::DownloadClient {
            let mut dc: DownloadClientIR = serde_json::from_value(resource.payload.clone()).unwrap();
            dc.id = resource.id;
            live.download_clients.retain(|c| c.id != resource.id);
            live.download_clients.push(dc);
        }
        Ok(())
    }

    async fn delete(&mut self, _ctx: &Context, target: &ResourceRef) -> Result<(), AdapterError> {
        let mut live = self.fake.live.lock().unwrap();
        match target.kind {
            ResourceKind::DownloadClient => live.download_clients.retain(|c| c.id != target.id),
            ResourceKind::QualityProfile => {
                if live.quality_profile.as_ref().is_some_and(|q| q.id == target.id) {
                    live.quality_profile = None;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Prowlarr stand-in that knows one application URL.
struct FakeProwlarr {
    app_url: Url,
}

#[async_trait]
impl Adapter for FakeProwlarr {
    fn backend(&self) -> BackendKind {
        BackendKind::Prowlarr
    }

    async fn connect(&self, _ctx: &Context, _conn: &ConnectionIR) -> Result<ServiceInfo, AdapterError> {
        Ok(ServiceInfo {
            version: "1.0.0".into(),
            start_time: None,
        })
    }

    async fn discover(&self, _ctx: &Context, _conn: &ConnectionIR) -> Result<Capabilities, AdapterError> {
        Ok(Capabilities::unrestricted(Utc::now()))
    }

    async fn current_state(
        &self,
        _ctx: &Context,
        _conn: &ConnectionIR,
        _owned: &ManagedResources,
    ) -> Result<IR, AdapterError> {
        Ok(IR::default())
    }

    async fn apply(
        &self,
        _ctx: &Context,
        _conn: &ConnectionIR,
        _changes: &ChangeSet,
        _owned: &ManagedResources,
    ) -> Result<ApplyResult, AdapterError> {
        Ok(ApplyResult::default())
    }

    fn as_registration_source(&self) -> Option<&dyn RegistrationSource> {
        Some(self)
    }
}

#[async_trait]
impl RegistrationSource for FakeProwlarr {
    async fn registered_application(
        &self,
        _ctx: &Context,
        _conn: &ConnectionIR,
        app_url: &Url,
    ) -> Result<Option<RegisteredApplication>, AdapterError> {
        Ok((*app_url == self.app_url).then(|| RegisteredApplication {
            id: 4,
            name: "Radarr".into(),
            sync_level: Some("fullSync".into()),
            synced_indexers: 7,
        }))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn settings() -> ReconcileSettings {
    ReconcileSettings {
        read_retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        },
        ..ReconcileSettings::default()
    }
}

fn reconciler(fake: &Arc<Fake>) -> Reconciler {
    let mut registry = Registry::new();
    registry.register(Arc::clone(fake) as Arc<dyn Adapter>);
    Reconciler::new(Arc::new(registry), settings())
}

fn object(name: &str, desired: IR) -> ManagedObject {
    ManagedObject {
        name: name.into(),
        generation: 1,
        suspend: false,
        backend: BackendKind::Radarr,
        connection: ConnectionIR::new(Url::parse("http://radarr:7878").unwrap(), Credential::None),
        desired,
        prowlarr: None,
    }
}

fn client(name: &str) -> DownloadClientIR {
    DownloadClientIR {
        id: None,
        name: name.into(),
        implementation: "QBittorrent".into(),
        enable: true,
        priority: Some(1),
        remove_completed_downloads: None,
        remove_failed_downloads: None,
        fields: [("host".to_owned(), json!("qbit"))].into(),
    }
}

fn clients(names: &[&str]) -> IR {
    IR {
        download_clients: names.iter().map(|n| client(n)).collect(),
        ..IR::default()
    }
}

fn ready_reason(status: &ObjectStatus) -> Option<&str> {
    status
        .condition(ConditionType::Ready)
        .map(|c| c.reason.as_str())
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_download_client_then_converge() {
    let fake = Arc::new(Fake::new());
    let reconciler = reconciler(&fake);
    let obj = object("movies", clients(&["qbittorrent-main"]));

    let first = reconciler
        .reconcile(&Context::default(), &obj, ObjectStatus::default())
        .await;
    assert_eq!(first.phase, Phase::Ready);
    let changes = first.changes.clone().unwrap();
    assert_eq!(changes.total_changes(), 1);
    assert_eq!(changes.creates[0].key, ResourceKey::name("qbittorrent-main"));
    let result = first.result.clone().unwrap();
    assert_eq!((result.applied, result.failed), (1, 0));

    let status = first.status;
    assert_eq!(status.managed_resources.download_client_ids.len(), 1);
    assert_eq!(status.last_applied_hash, obj.fingerprint().ok());
    assert_eq!(status.observed_generation, Some(1));
    assert_eq!(status.service_version.as_deref(), Some("5.0.0"));
    assert!(status.is_ready());

    let second = reconciler.reconcile(&Context::default(), &obj, status).await;
    assert_eq!(second.phase, Phase::Ready);
    assert!(second.changes.unwrap().is_empty());
    assert_eq!(fake.live().download_clients.len(), 1);
}

#[tokio::test]
async fn test_managed_quality_profile_without_desired_is_deleted() {
    let fake = Arc::new(Fake::new());
    let mut profile = QualityIR::new("custom");
    profile.id = Some(12);
    profile.tiers = vec!["1080/bluray".parse().unwrap()];
    fake.live.lock().unwrap().quality_profile = Some(profile);

    let mut owned = ManagedResources::default();
    owned.record(ResourceKind::QualityProfile, 12);

    let plan = reconciler(&fake)
        .plan(&Context::default(), &object("movies", IR::default()), &owned)
        .await
        .unwrap();
    assert_eq!(
        plan.changes.deletes,
        vec![ResourceRef {
            kind: ResourceKind::QualityProfile,
            key: ResourceKey::Id(12),
            id: Some(12),
        }]
    );
    assert_eq!(plan.changes.total_changes(), 1);
}

#[tokio::test]
async fn test_hand_made_resources_are_left_alone() {
    let fake = Arc::new(Fake::new());
    let mut manual = client("my-sabnzbd");
    manual.id = Some(7);
    fake.live.lock().unwrap().download_clients.push(manual);

    let outcome = reconciler(&fake)
        .reconcile(&Context::default(), &object("movies", IR::default()), ObjectStatus::default())
        .await;
    assert_eq!(outcome.phase, Phase::Ready);
    assert!(outcome.changes.unwrap().is_empty());
    assert_eq!(fake.live().download_clients.len(), 1);
}

#[tokio::test]
async fn test_unsupported_tiers_are_gated_out_of_the_plan() {
    let mut fake = Fake::new();
    fake.caps.add_resolution(Resolution::R1080);
    let fake = Arc::new(fake);

    let mut profile = QualityIR::new("nebularr-hd");
    profile.tiers = vec!["2160/bluray".parse().unwrap(), "1080/bluray".parse().unwrap()];
    let desired = IR {
        quality_profile: Some(profile),
        ..IR::default()
    };

    let plan = reconciler(&fake)
        .plan(&Context::default(), &object("movies", desired), &ManagedResources::default())
        .await
        .unwrap();
    let create = &plan.changes.creates[0];
    assert_eq!(create.kind, ResourceKind::QualityProfile);
    assert_eq!(create.payload["tiers"], json!(["1080/bluray"]));
    assert_eq!(create.payload["cutoff"], json!("1080/bluray"));
}

#[tokio::test]
async fn test_partial_failure_is_degraded() {
    let mut fake = Fake::new();
    fake.fail_names = vec!["b".into()];
    let fake = Arc::new(fake);
    let obj = object("movies", clients(&["a", "b", "c"]));

    let outcome = reconciler(&fake)
        .reconcile(&Context::default(), &obj, ObjectStatus::default())
        .await;
    assert_eq!(outcome.phase, Phase::Degraded);
    let result = outcome.result.unwrap();
    assert_eq!((result.applied, result.failed, result.skipped), (2, 1, 0));
    assert_eq!(result.errors[0].resource.key, ResourceKey::name("b"));

    let status = outcome.status;
    assert_eq!(status.managed_resources.download_client_ids.len(), 2);
    assert_eq!(status.last_applied_hash, None);
    assert_eq!(status.consecutive_failures, 1);
    assert_eq!(ready_reason(&status), Some("PartialApply"));
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(5)));
}

#[tokio::test]
async fn test_connect_failure_backs_off() {
    let mut fake = Fake::new();
    fake.fail_connect = true;
    let fake = Arc::new(fake);
    let reconciler = reconciler(&fake);
    let obj = object("movies", clients(&["a"]));

    let first = reconciler
        .reconcile(&Context::default(), &obj, ObjectStatus::default())
        .await;
    assert_eq!(first.phase, Phase::Failed);
    assert_eq!(fake.connects.load(Ordering::SeqCst), 3);
    assert_eq!(ready_reason(&first.status), Some("ConnectFailed"));
    assert_eq!(
        first
            .status
            .condition(ConditionType::Connected)
            .map(|c| c.status),
        Some(ConditionStatus::False)
    );
    assert_eq!(first.requeue_after, Some(Duration::from_secs(5)));

    let second = reconciler.reconcile(&Context::default(), &obj, first.status).await;
    assert_eq!(second.status.consecutive_failures, 2);
    assert_eq!(second.requeue_after, Some(Duration::from_secs(10)));
    assert!(fake.live().download_clients.is_empty());
}

#[tokio::test]
async fn test_invalid_spec_requeues_at_period() {
    let fake = Arc::new(Fake::new());
    let mut profile = QualityIR::new("nebularr-hd");
    profile.preset = Some("balanced".into());
    profile.tiers = vec!["1080/bluray".parse().unwrap()];
    let obj = object(
        "movies",
        IR {
            quality_profile: Some(profile),
            ..IR::default()
        },
    );

    let outcome = reconciler(&fake)
        .reconcile(&Context::default(), &obj, ObjectStatus::default())
        .await;
    assert_eq!(outcome.phase, Phase::Failed);
    assert_eq!(ready_reason(&outcome.status), Some("InvalidSpec"));
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(300)));
}

#[tokio::test]
async fn test_suspended_object_is_not_contacted() {
    let fake = Arc::new(Fake::new());
    let mut obj = object("movies", clients(&["a"]));
    obj.suspend = true;

    let outcome = reconciler(&fake)
        .reconcile(&Context::default(), &obj, ObjectStatus::default())
        .await;
    assert_eq!(outcome.phase, Phase::Suspended);
    assert_eq!(outcome.requeue_after, None);
    assert_eq!(fake.connects.load(Ordering::SeqCst), 0);
    assert_eq!(ready_reason(&outcome.status), Some("Suspended"));
}

#[tokio::test]
async fn test_missing_adapter_fails() {
    let reconciler = Reconciler::new(Arc::new(Registry::new()), settings());
    let outcome = reconciler
        .reconcile(&Context::default(), &object("movies", IR::default()), ObjectStatus::default())
        .await;
    assert_eq!(outcome.phase, Phase::Failed);
    assert_eq!(ready_reason(&outcome.status), Some("NoAdapter"));
}

#[tokio::test]
async fn test_health_is_reported_without_changing_readiness() {
    let mut fake = Fake::new();
    fake.unhealthy = true;
    let fake = Arc::new(fake);

    let outcome = reconciler(&fake)
        .reconcile(&Context::default(), &object("movies", IR::default()), ObjectStatus::default())
        .await;
    assert_eq!(outcome.phase, Phase::Ready);
    let healthy = outcome.status.condition(ConditionType::Healthy).unwrap();
    assert_eq!(healthy.status, ConditionStatus::False);
    assert_eq!(outcome.status.health.map(|h| h.issues.len()), Some(1));
}

#[tokio::test]
async fn test_prowlarr_registration_is_observed() {
    let fake = Arc::new(Fake::new());
    let app_url = Url::parse("http://radarr:7878").unwrap();
    let mut registry = Registry::new();
    registry.register(Arc::clone(&fake) as Arc<dyn Adapter>);
    registry.register(Arc::new(FakeProwlarr {
        app_url: app_url.clone(),
    }));
    let reconciler = Reconciler::new(Arc::new(registry), settings());

    let mut obj = object("movies", IR::default());
    obj.prowlarr = Some(ProwlarrRef {
        name: "indexers".into(),
        connection: ConnectionIR::new(Url::parse("http://prowlarr:9696").unwrap(), Credential::None),
    });

    let outcome = reconciler
        .reconcile(&Context::default(), &obj, ObjectStatus::default())
        .await;
    let registration = outcome.status.prowlarr_registration.unwrap();
    assert!(registration.registered);
    assert_eq!(registration.application_id, Some(4));
    assert_eq!(registration.synced_indexers, 7);
    assert_eq!(registration.prowlarr_name, "indexers");
}

#[tokio::test]
async fn test_cancelled_context_fails_the_pass() {
    let fake = Arc::new(Fake::new());
    let ctx = Context::default();
    ctx.cancel();
    let outcome = reconciler(&fake)
        .reconcile(&ctx, &object("movies", clients(&["a"])), ObjectStatus::default())
        .await;
    assert_eq!(outcome.phase, Phase::Failed);
    assert!(fake.live().download_clients.is_empty());
}

// ── Worker pool ─────────────────────────────────────────────────────

fn pool(fake: &Arc<Fake>, store: Arc<MemoryStatusStore>) -> Arc<ReconcilePool> {
    Arc::new(ReconcilePool::new(Arc::new(reconciler(fake)), store, 4))
}

#[tokio::test]
async fn test_pool_serializes_passes_per_object() {
    let mut fake = Fake::new();
    fake.connect_delay = Duration::from_millis(50);
    let fake = Arc::new(fake);
    let store = Arc::new(MemoryStatusStore::new());
    let pool = pool(&fake, Arc::clone(&store));
    let obj = object("movies", clients(&["a"]));
    let ctx = Context::default();

    let (a, b) = tokio::join!(pool.reconcile(&ctx, &obj), pool.reconcile(&ctx, &obj));
    assert_eq!(a.unwrap().phase, Phase::Ready);
    assert_eq!(b.unwrap().phase, Phase::Ready);
    assert_eq!(fake.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(fake.live().download_clients.len(), 1);

    let stored = store.load("movies").await.unwrap().unwrap();
    assert_eq!(stored.managed_resources.download_client_ids.len(), 1);
}

#[tokio::test]
async fn test_pool_runs_distinct_objects_concurrently() {
    let mut fake = Fake::new();
    fake.connect_delay = Duration::from_millis(50);
    let fake = Arc::new(fake);
    let pool = pool(&fake, Arc::new(MemoryStatusStore::new()));

    let objects = vec![object("b", IR::default()), object("a", IR::default())];
    let results = pool.reconcile_all(&Context::default(), &objects).await;
    let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    assert!(results.iter().all(|(_, r)| r.as_ref().is_ok_and(|o| o.phase == Phase::Ready)));
    assert_eq!(fake.max_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_pool_keeps_object_locked_after_caller_gives_up() {
    let mut fake = Fake::new();
    fake.connect_delay = Duration::from_millis(100);
    let fake = Arc::new(fake);
    let store = Arc::new(MemoryStatusStore::new());
    let pool = pool(&fake, Arc::clone(&store));
    let obj = object("movies", clients(&["a"]));
    let ctx = Context::default();

    let abandoned = tokio::time::timeout(Duration::from_millis(20), pool.reconcile(&ctx, &obj)).await;
    assert!(abandoned.is_err());

    let outcome = pool.reconcile(&ctx, &obj).await.unwrap();
    assert_eq!(outcome.phase, Phase::Ready);
    assert_eq!(fake.connects.load(Ordering::SeqCst), 2);
    assert_eq!(fake.max_in_flight.load(Ordering::SeqCst), 1);
    // The second pass saw the first one's status and adopted its client.
    assert_eq!(fake.live().download_clients.len(), 1);
    assert_eq!(outcome.changes.unwrap().total_changes(), 0);
    let stored = store.load("movies").await.unwrap().unwrap();
    assert_eq!(stored.managed_resources.download_client_ids.len(), 1);
}

#[tokio::test]
async fn test_pool_contains_panics() {
    let mut fake = Fake::new();
    fake.panic_connect = true;
    let fake = Arc::new(fake);
    let store = Arc::new(MemoryStatusStore::new());
    let pool = pool(&fake, Arc::clone(&store));

    let outcome = pool
        .reconcile(&Context::default(), &object("movies", IR::default()))
        .await
        .unwrap();
    assert_eq!(outcome.phase, Phase::Failed);
    assert_eq!(ready_reason(&outcome.status), Some("Panicked"));

    let stored = store.load("movies").await.unwrap().unwrap();
    assert_eq!(stored.consecutive_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_mid_apply_keeps_created_identities() {
    let mut fake = Fake::new();
    fake.create_delay = Duration::from_millis(100);
    let fake = Arc::new(fake);
    let mut registry = Registry::new();
    registry.register(Arc::clone(&fake) as Arc<dyn Adapter>);
    let reconciler = Reconciler::new(
        Arc::new(registry),
        ReconcileSettings {
            deadline: Duration::from_millis(150),
            ..settings()
        },
    );
    let obj = object("movies", clients(&["qbittorrent-main", "sabnzbd-main"]));

    let first = reconciler
        .reconcile(&Context::default(), &obj, ObjectStatus::default())
        .await;
    assert_eq!(first.phase, Phase::Degraded);
    let result = first.result.clone().unwrap();
    assert_eq!(result.applied, 1);
    assert_eq!(result.recorded.len(), 1);
    let created = fake.live().download_clients[0].id.unwrap();
    assert!(
        first
            .status
            .managed_resources
            .download_client_ids
            .contains(&created)
    );
    assert_ne!(first.status.last_applied_hash, obj.fingerprint().ok());

    // The next pass only creates what the interrupted one did not reach.
    let second = reconciler.reconcile(&Context::default(), &obj, first.status).await;
    assert_eq!(second.phase, Phase::Ready);
    let changes = second.changes.unwrap();
    assert_eq!(changes.creates.len(), 1);
    assert_eq!(changes.creates[0].key, ResourceKey::name("sabnzbd-main"));
    assert_eq!(fake.live().download_clients.len(), 2);
}
