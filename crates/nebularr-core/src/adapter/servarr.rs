// ── Servarr adapter ──
//
// One adapter for the whole Servarr family. The flavor picks the API
// version, the media kind and the resource kinds the backend manages.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use nebularr_api::servarr::{ConfigEndpoint, Endpoint};
use nebularr_api::servarr::models::ProviderSchema;
use nebularr_api::{ApiVersion, ServarrClient};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::convert::{
    auth_from_wire, auth_into_wire, from_wire, merge_into_wire, naming_from_wire,
    naming_into_wire, quality_from_wire, quality_into_wire, wire_id, wire_str,
};
use super::{
    Adapter, BackendKind, HealthIssue, HealthReporter, HealthStatus, RegisteredApplication,
    RegistrationSource, ServiceInfo,
};
use crate::apply::{self, ResourceWriter};
use crate::capabilities::Capabilities;
use crate::changeset::{ApplyResult, ChangeSet, Resource, ResourceKey, ResourceKind, ResourceRef};
use crate::connection::{ConnectionIR, Credential};
use crate::context::Context;
use crate::diff::{self, validate};
use crate::error::{AdapterError, DiffError};
use crate::ir::{AuthenticationIR, DelayProfileIR, IR, Keyed, NamingIR, QualityIR, RootFolderIR};
use crate::ownership::{ManagedResources, has_managed_prefix};
use crate::tier::{MediaKind, Tier, quality_to_tier};

#[derive(Debug, Clone, Copy)]
pub struct ServarrAdapter {
    flavor: BackendKind,
}

impl ServarrAdapter {
    /// `None` for backends outside the Servarr family.
    pub fn new(flavor: BackendKind) -> Option<Self> {
        match flavor {
            BackendKind::File => None,
            _ => Some(Self { flavor }),
        }
    }

    pub fn flavor(&self) -> BackendKind {
        self.flavor
    }

    pub fn api_version(&self) -> ApiVersion {
        match self.flavor {
            BackendKind::Lidarr | BackendKind::Prowlarr => ApiVersion::V1,
            _ => ApiVersion::V3,
        }
    }

    fn media(&self) -> Option<MediaKind> {
        match self.flavor {
            BackendKind::Radarr | BackendKind::Sonarr => Some(MediaKind::Video),
            BackendKind::Lidarr => Some(MediaKind::Audio),
            BackendKind::Prowlarr | BackendKind::File => None,
        }
    }

    /// Resource kinds this flavor manages.
    pub fn supports(&self, kind: ResourceKind) -> bool {
        match self.flavor {
            BackendKind::Prowlarr => matches!(
                kind,
                ResourceKind::DownloadClient
                    | ResourceKind::Indexer
                    | ResourceKind::Notification
                    | ResourceKind::Authentication
            ),
            BackendKind::Radarr | BackendKind::Sonarr | BackendKind::Lidarr => true,
            BackendKind::File => false,
        }
    }

    fn client(&self, conn: &ConnectionIR) -> Result<ServarrClient, AdapterError> {
        let Credential::ApiKey(key) = &conn.credential else {
            return Err(AdapterError::CredentialRejected {
                message: format!("{} requires an API key", self.flavor),
            });
        };
        Ok(ServarrClient::from_api_key(
            &conn.url,
            key,
            self.api_version(),
            &conn.transport(),
        )?)
    }

    async fn owned_list<T>(
        &self,
        client: &ServarrClient,
        kind: ResourceKind,
        owned: &ManagedResources,
    ) -> Result<Vec<T>, AdapterError>
    where
        T: DeserializeOwned + Keyed,
    {
        let Some(endpoint) = endpoint(kind).filter(|_| self.supports(kind)) else {
            return Ok(Vec::new());
        };
        owned_entries(client.list(endpoint).await?, owned)
    }
}

fn owned_entries<T>(raw: Vec<Value>, owned: &ManagedResources) -> Result<Vec<T>, AdapterError>
where
    T: DeserializeOwned + Keyed,
{
    let mut out = Vec::new();
    for value in raw {
        let item: T = from_wire(value)?;
        if owned.owns(T::KIND, item.name(), item.id()) {
            out.push(item);
        }
    }
    Ok(out)
}

fn endpoint(kind: ResourceKind) -> Option<Endpoint> {
    match kind {
        ResourceKind::QualityProfile => Some(Endpoint::QualityProfile),
        ResourceKind::CustomFormat => Some(Endpoint::CustomFormat),
        ResourceKind::DownloadClient => Some(Endpoint::DownloadClient),
        ResourceKind::Indexer => Some(Endpoint::Indexer),
        ResourceKind::ImportList => Some(Endpoint::ImportList),
        ResourceKind::Notification => Some(Endpoint::Notification),
        ResourceKind::DelayProfile => Some(Endpoint::DelayProfile),
        ResourceKind::ReleaseProfile => Some(Endpoint::ReleaseProfile),
        ResourceKind::RootFolder => Some(Endpoint::RootFolder),
        ResourceKind::Naming | ResourceKind::MediaManagement | ResourceKind::Authentication => None,
    }
}

fn config_endpoint(kind: ResourceKind) -> Option<ConfigEndpoint> {
    match kind {
        ResourceKind::Naming => Some(ConfigEndpoint::Naming),
        ResourceKind::MediaManagement => Some(ConfigEndpoint::MediaManagement),
        ResourceKind::Authentication => Some(ConfigEndpoint::Host),
        _ => None,
    }
}

/// Identity of a live wire object, computed the same way as for IR entries.
fn wire_key(kind: ResourceKind, value: &Value) -> Option<ResourceKey> {
    match kind {
        ResourceKind::DelayProfile => {
            let order = value.get("order").and_then(Value::as_i64)?;
            let profile = DelayProfileIR {
                order: i32::try_from(order).ok()?,
                ..DelayProfileIR::default()
            };
            Some(Keyed::key(&profile))
        }
        ResourceKind::RootFolder => {
            let folder = RootFolderIR {
                path: wire_str(value, "path")?.to_owned(),
                ..RootFolderIR::default()
            };
            Some(folder.key())
        }
        _ => wire_str(value, "name").map(ResourceKey::name),
    }
}

fn matches_key(kind: ResourceKind, key: &ResourceKey, value: &Value) -> bool {
    match key {
        ResourceKey::Id(id) => wire_id(value) == Some(*id),
        ResourceKey::Name(_) => wire_key(kind, value).as_ref() == Some(key),
    }
}

/// The managed profile: the recorded ID first, else the first prefixed name.
fn pick_profile<'a>(profiles: &'a [Value], owned: &ManagedResources) -> Option<&'a Value> {
    let recorded = owned
        .quality_profile_id
        .and_then(|id| profiles.iter().find(|p| wire_id(p) == Some(id)));
    recorded.or_else(|| {
        profiles
            .iter()
            .find(|p| wire_str(p, "name").is_some_and(has_managed_prefix))
    })
}

fn format_names(formats: &[Value]) -> BTreeMap<i64, String> {
    formats
        .iter()
        .filter_map(|f| Some((wire_id(f)?, wire_str(f, "name")?.to_owned())))
        .collect()
}

fn decode<T: DeserializeOwned>(payload: &Value) -> Result<T, AdapterError> {
    serde_json::from_value(payload.clone()).map_err(|e| AdapterError::Protocol {
        message: format!("malformed change payload: {e}"),
    })
}

#[async_trait]
impl Adapter for ServarrAdapter {
    fn backend(&self) -> BackendKind {
        self.flavor
    }

    async fn connect(
        &self,
        _ctx: &Context,
        conn: &ConnectionIR,
    ) -> Result<ServiceInfo, AdapterError> {
        let status = self.client(conn)?.system_status().await?;
        if let Some(app) = &status.app_name {
            if !app.eq_ignore_ascii_case(&self.flavor.to_string()) {
                return Err(AdapterError::Protocol {
                    message: format!("expected {} at {}, found {app}", self.flavor, conn.url),
                });
            }
        }
        debug!(version = %status.version, "connected");
        Ok(ServiceInfo {
            version: status.version,
            start_time: status.start_time,
        })
    }

    async fn discover(
        &self,
        _ctx: &Context,
        conn: &ConnectionIR,
    ) -> Result<Capabilities, AdapterError> {
        let client = self.client(conn)?;
        let mut caps = Capabilities::unrestricted(Utc::now());

        if self.media() == Some(MediaKind::Video) {
            for def in client.quality_definitions().await? {
                if let Some(Tier::Video { resolution, source }) = quality_to_tier(&def.quality.name)
                {
                    caps.add_resolution(resolution);
                    caps.add_source(source);
                }
            }
        }
        for schema in client.schema(Endpoint::DownloadClient).await? {
            caps.add_download_client_type(&schema.implementation);
        }
        for schema in client.schema(Endpoint::Indexer).await? {
            caps.add_indexer_type(&schema.implementation);
        }
        debug!(
            resolutions = caps.resolutions.len(),
            download_clients = caps.download_client_types.len(),
            indexers = caps.indexer_types.len(),
            "discovered"
        );
        Ok(caps)
    }

    async fn current_state(
        &self,
        _ctx: &Context,
        conn: &ConnectionIR,
        owned: &ManagedResources,
    ) -> Result<IR, AdapterError> {
        let client = self.client(conn)?;
        let mut ir = IR::default();

        if self.supports(ResourceKind::CustomFormat) {
            let formats = client.list(Endpoint::CustomFormat).await?;
            let names = format_names(&formats);
            ir.custom_formats = owned_entries(formats, owned)?;

            if let Some(media) = self.media() {
                let profiles = client.list(Endpoint::QualityProfile).await?;
                ir.quality_profile =
                    pick_profile(&profiles, owned).map(|p| quality_from_wire(p, media, &names));
            }
        }

        ir.root_folders = self.owned_list(&client, ResourceKind::RootFolder, owned).await?;
        ir.download_clients = self
            .owned_list(&client, ResourceKind::DownloadClient, owned)
            .await?;
        ir.indexers = self.owned_list(&client, ResourceKind::Indexer, owned).await?;
        ir.import_lists = self.owned_list(&client, ResourceKind::ImportList, owned).await?;
        ir.notifications = self
            .owned_list(&client, ResourceKind::Notification, owned)
            .await?;
        ir.delay_profiles = self
            .owned_list(&client, ResourceKind::DelayProfile, owned)
            .await?;
        ir.release_profiles = self
            .owned_list(&client, ResourceKind::ReleaseProfile, owned)
            .await?;

        if self.supports(ResourceKind::Naming) {
            let wire = client.get_config(ConfigEndpoint::Naming).await?;
            ir.naming = Some(naming_from_wire(&wire, self.flavor));
        }
        if self.supports(ResourceKind::MediaManagement) {
            let wire = client.get_config(ConfigEndpoint::MediaManagement).await?;
            ir.media_management = Some(from_wire(wire)?);
        }
        if self.supports(ResourceKind::Authentication) {
            let wire = client.get_config(ConfigEndpoint::Host).await?;
            ir.authentication = Some(auth_from_wire(&wire));
        }
        Ok(ir)
    }

    fn diff(
        &self,
        current: &IR,
        desired: &IR,
        caps: &Capabilities,
        owned: &ManagedResources,
    ) -> Result<ChangeSet, DiffError> {
        if let Some(kind) = validate::kinds_present(desired)
            .into_iter()
            .find(|k| !self.supports(*k))
        {
            return Err(DiffError::UnsupportedKind {
                backend: self.flavor,
                kind,
            });
        }

        let mut desired = Cow::Borrowed(desired);
        if let Some(media) = self.media() {
            if desired.quality_profile.as_ref().is_some_and(|q| q.media.is_none()) {
                if let Some(q) = desired.to_mut().quality_profile.as_mut() {
                    q.media = Some(media);
                }
            }
        }
        diff::diff(current, &desired, caps, owned)
    }

    async fn apply(
        &self,
        ctx: &Context,
        conn: &ConnectionIR,
        changes: &ChangeSet,
        owned: &ManagedResources,
    ) -> Result<ApplyResult, AdapterError> {
        let mut writer = ServarrWriter {
            flavor: self.flavor,
            client: self.client(conn)?,
            owned,
            live: HashMap::new(),
            schemas: HashMap::new(),
        };
        apply::execute(ctx, &mut writer, changes, owned).await
    }

    fn as_health_reporter(&self) -> Option<&dyn HealthReporter> {
        Some(self)
    }

    fn as_registration_source(&self) -> Option<&dyn RegistrationSource> {
        (self.flavor == BackendKind::Prowlarr).then_some(self as &dyn RegistrationSource)
    }
}

#[async_trait]
impl HealthReporter for ServarrAdapter {
    async fn health(&self, _ctx: &Context, conn: &ConnectionIR) -> Result<HealthStatus, AdapterError> {
        let checks = self.client(conn)?.health().await?;
        let issues: Vec<HealthIssue> = checks
            .into_iter()
            .filter(|c| !c.check_type.eq_ignore_ascii_case("ok"))
            .map(|c| HealthIssue {
                source: c.source.unwrap_or_default(),
                severity: c.check_type.to_ascii_lowercase(),
                message: c.message,
            })
            .collect();
        Ok(HealthStatus {
            healthy: !issues.iter().any(|i| i.severity == "error"),
            issues,
        })
    }
}

/// Same scheme, host, port and path, ignoring a trailing slash.
fn same_base_url(raw: &str, want: &Url) -> bool {
    let Ok(have) = Url::parse(raw.trim()) else {
        return false;
    };
    have.scheme() == want.scheme()
        && have.host_str().map(str::to_ascii_lowercase) == want.host_str().map(str::to_ascii_lowercase)
        && have.port_or_known_default() == want.port_or_known_default()
        && have.path().trim_end_matches('/') == want.path().trim_end_matches('/')
}

#[async_trait]
impl RegistrationSource for ServarrAdapter {
    async fn registered_application(
        &self,
        _ctx: &Context,
        conn: &ConnectionIR,
        app_url: &Url,
    ) -> Result<Option<RegisteredApplication>, AdapterError> {
        let client = self.client(conn)?;
        let app = client.applications().await?.into_iter().find(|a| {
            a.field_str("baseUrl")
                .is_some_and(|base| same_base_url(base, app_url))
        });
        let Some(app) = app else {
            return Ok(None);
        };
        let synced_indexers = client
            .list(Endpoint::Indexer)
            .await?
            .iter()
            .filter(|ix| ix.get("enable").and_then(Value::as_bool).unwrap_or(false))
            .count();
        Ok(Some(RegisteredApplication {
            id: app.id,
            name: app.name,
            sync_level: app.sync_level,
            synced_indexers,
        }))
    }
}

// ── Writer ───────────────────────────────────────────────────────────

/// Per-apply session. Caches live lists and schemas so upserts and
/// templates cost one GET per endpoint.
struct ServarrWriter<'a> {
    flavor: BackendKind,
    client: ServarrClient,
    owned: &'a ManagedResources,
    live: HashMap<Endpoint, Vec<Value>>,
    schemas: HashMap<Endpoint, Vec<ProviderSchema>>,
}

fn unsupported(op: &str, kind: ResourceKind) -> AdapterError {
    AdapterError::Unsupported {
        operation: format!("{op} {kind}"),
    }
}

impl ServarrWriter<'_> {
    async fn live(&mut self, endpoint: Endpoint) -> Result<&mut Vec<Value>, AdapterError> {
        if !self.live.contains_key(&endpoint) {
            let items = self.client.list(endpoint).await?;
            self.live.insert(endpoint, items);
        }
        Ok(self.live.entry(endpoint).or_default())
    }

    async fn find(
        &mut self,
        kind: ResourceKind,
        endpoint: Endpoint,
        key: &ResourceKey,
    ) -> Result<Option<Value>, AdapterError> {
        Ok(self
            .live(endpoint)
            .await?
            .iter()
            .find(|v| matches_key(kind, key, v))
            .cloned())
    }

    async fn format_ids(&mut self) -> Result<BTreeMap<String, i64>, AdapterError> {
        if self.flavor == BackendKind::Prowlarr {
            return Ok(BTreeMap::new());
        }
        Ok(self
            .live(Endpoint::CustomFormat)
            .await?
            .iter()
            .filter_map(|f| Some((wire_str(f, "name")?.to_owned(), wire_id(f)?)))
            .collect())
    }

    async fn provider_template(
        &mut self,
        endpoint: Endpoint,
        implementation: &str,
    ) -> Result<Value, AdapterError> {
        if !self.schemas.contains_key(&endpoint) {
            let schemas = self.client.schema(endpoint).await?;
            self.schemas.insert(endpoint, schemas);
        }
        let schema = self
            .schemas
            .get(&endpoint)
            .and_then(|all| {
                all.iter()
                    .find(|s| s.implementation.eq_ignore_ascii_case(implementation))
            })
            .ok_or_else(|| AdapterError::Rejected {
                status: 400,
                message: format!("unknown {} implementation `{implementation}`", endpoint.path()),
            })?;
        serde_json::to_value(schema).map_err(|e| AdapterError::Protocol {
            message: e.to_string(),
        })
    }

    /// Starting object for a create.
    async fn base_for(&mut self, resource: &Resource, endpoint: Endpoint) -> Result<Value, AdapterError> {
        let mut base = match resource.kind {
            ResourceKind::QualityProfile => self.client.template(endpoint).await?,
            _ if endpoint.is_provider() => {
                let implementation = wire_str(&resource.payload, "implementation").unwrap_or_default();
                let mut template = self.provider_template(endpoint, implementation).await?;
                if let Some(obj) = template.as_object_mut() {
                    obj.remove("id");
                }
                template
            }
            ResourceKind::DelayProfile => json!({ "tags": [] }),
            ResourceKind::ReleaseProfile => json!({ "tags": [], "indexerId": 0, "enabled": true }),
            ResourceKind::RootFolder if self.flavor == BackendKind::Lidarr => {
                let path = wire_str(&resource.payload, "path").unwrap_or_default();
                let name = path
                    .trim_end_matches(['/', '\\'])
                    .rsplit(['/', '\\'])
                    .next()
                    .unwrap_or(path);
                json!({
                    "name": name,
                    "defaultMetadataProfileId": 1,
                    "defaultQualityProfileId": self.owned.quality_profile_id.unwrap_or(1),
                    "defaultMonitorOption": "all",
                    "defaultNewItemMonitorOption": "all",
                    "defaultTags": [],
                })
            }
            _ => json!({}),
        };

        let unset = |v: Option<&Value>| v.and_then(Value::as_i64).is_none_or(|n| n == 0);
        if let Some(obj) = base.as_object_mut() {
            if resource.kind == ResourceKind::Indexer
                && self.flavor == BackendKind::Prowlarr
                && unset(obj.get("appProfileId"))
            {
                obj.insert("appProfileId".into(), Value::from(1));
            }
            if resource.kind == ResourceKind::ImportList && unset(obj.get("qualityProfileId")) {
                if let Some(id) = self.owned.quality_profile_id {
                    obj.insert("qualityProfileId".into(), Value::from(id));
                }
            }
        }
        Ok(base)
    }

    /// Write a payload onto a wire object.
    async fn fill(&mut self, kind: ResourceKind, body: &mut Value, payload: &Value) -> Result<(), AdapterError> {
        match kind {
            ResourceKind::QualityProfile => {
                let q: QualityIR = decode(payload)?;
                let ids = self.format_ids().await?;
                quality_into_wire(body, &q, &ids)?;
            }
            ResourceKind::Naming => {
                let naming: NamingIR = decode(payload)?;
                naming_into_wire(body, &naming, self.flavor);
            }
            ResourceKind::Authentication => {
                let auth: AuthenticationIR = decode(payload)?;
                auth_into_wire(body, &auth);
            }
            _ => merge_into_wire(body, payload),
        }
        Ok(())
    }

    async fn write_update(
        &mut self,
        resource: &Resource,
        endpoint: Endpoint,
        mut live: Value,
    ) -> Result<i64, AdapterError> {
        let id = wire_id(&live).ok_or_else(|| AdapterError::Protocol {
            message: format!("{} has no id", resource.to_ref()),
        })?;
        self.fill(resource.kind, &mut live, &resource.payload).await?;
        let stored = self.client.update(endpoint, id, &live).await?;
        if let Some(list) = self.live.get_mut(&endpoint) {
            if let Some(slot) = list.iter_mut().find(|v| wire_id(v) == Some(id)) {
                *slot = stored;
            }
        }
        Ok(id)
    }

    async fn resolve_id(&mut self, target: &ResourceRef, endpoint: Endpoint) -> Result<i64, AdapterError> {
        if let Some(id) = target.id {
            return Ok(id);
        }
        if let ResourceKey::Id(id) = target.key {
            return Ok(id);
        }
        self.find(target.kind, endpoint, &target.key)
            .await?
            .as_ref()
            .and_then(wire_id)
            .ok_or_else(|| AdapterError::NotFound {
                what: target.to_string(),
            })
    }
}

#[async_trait]
impl ResourceWriter for ServarrWriter<'_> {
    async fn begin(&mut self, _ctx: &Context) -> Result<(), AdapterError> {
        self.client.system_status().await?;
        Ok(())
    }

    /// Upsert by identity: an existing owned resource is updated in place,
    /// an unowned one is a conflict.
    async fn create(&mut self, _ctx: &Context, resource: &Resource) -> Result<Option<i64>, AdapterError> {
        let endpoint = endpoint(resource.kind).ok_or_else(|| unsupported("create", resource.kind))?;

        if let Some(existing) = self.find(resource.kind, endpoint, &resource.key).await? {
            if !self.owned.owns(resource.kind, resource.name(), wire_id(&existing)) {
                return Err(AdapterError::Conflict {
                    name: resource.key.to_string(),
                });
            }
            debug!(resource = %resource.to_ref(), "adopting existing resource");
            return self.write_update(resource, endpoint, existing).await.map(Some);
        }

        let mut body = self.base_for(resource, endpoint).await?;
        self.fill(resource.kind, &mut body, &resource.payload).await?;
        let stored = self.client.create(endpoint, &body).await?;
        let id = wire_id(&stored);
        self.live(endpoint).await?.push(stored);
        Ok(id)
    }

    async fn update(&mut self, _ctx: &Context, resource: &Resource) -> Result<(), AdapterError> {
        if let Some(config) = config_endpoint(resource.kind) {
            let mut live = self.client.get_config(config).await?;
            self.fill(resource.kind, &mut live, &resource.payload).await?;
            self.client.put_config(config, &live).await?;
            return Ok(());
        }
        let endpoint = endpoint(resource.kind).ok_or_else(|| unsupported("update", resource.kind))?;
        let id = self.resolve_id(&resource.to_ref(), endpoint).await?;
        let live = self.client.get_one(endpoint, id).await?;
        self.write_update(resource, endpoint, live).await.map(|_| ())
    }

    async fn delete(&mut self, _ctx: &Context, target: &ResourceRef) -> Result<(), AdapterError> {
        let endpoint = endpoint(target.kind).ok_or_else(|| unsupported("delete", target.kind))?;
        let id = self.resolve_id(target, endpoint).await?;
        self.client.delete_one(endpoint, id).await?;
        if let Some(list) = self.live.get_mut(&endpoint) {
            list.retain(|v| wire_id(v) != Some(id));
        }
        Ok(())
    }
}
