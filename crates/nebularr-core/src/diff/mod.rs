// ── Diff engine ──
//
// Pure function from (current, desired, capabilities, ownership) to a
// deterministic `ChangeSet`:
//
//   1. validate the desired state
//   2. resolve presets and normalize quality profiles
//   3. gate desired entries against capabilities (dropped entries are held)
//   4. key both sides by stable identity; keys of unowned live entries are held
//   5. emit creates, updates and owned deletes, sorted by kind then key

pub mod compare;
pub mod quality;
pub mod validate;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::capabilities::Capabilities;
use crate::changeset::{ChangeSet, Resource, ResourceKey, ResourceKind, ResourceRef};
use crate::error::DiffError;
use crate::ir::{Keyed, QualityIR, IR};
use crate::ownership::ManagedResources;

pub use compare::{payload_matches, REDACTED};

/// Which live entries the diff may touch.
#[derive(Debug, Clone, Copy)]
pub enum Ownership<'a> {
    /// Recorded IDs and prefixed names only.
    Managed(&'a ManagedResources),
    /// Whole-replace backends own everything they hold.
    Everything,
}

impl Ownership<'_> {
    fn owns(&self, kind: ResourceKind, name: Option<&str>, id: Option<i64>) -> bool {
        match self {
            Self::Managed(owned) => owned.owns(kind, name, id),
            Self::Everything => true,
        }
    }

    fn recorded(&self, kind: ResourceKind, id: Option<i64>) -> bool {
        match self {
            Self::Managed(owned) => id.is_some_and(|id| owned.contains(kind, id)),
            Self::Everything => false,
        }
    }
}

/// Diff against recorded ownership.
pub fn diff(
    current: &IR,
    desired: &IR,
    caps: &Capabilities,
    owned: &ManagedResources,
) -> Result<ChangeSet, DiffError> {
    diff_with(current, desired, caps, Ownership::Managed(owned))
}

/// Validate and normalize a desired state without diffing it.
pub fn prepare(desired: &IR) -> Result<IR, DiffError> {
    validate::validate(desired)?;
    let mut out = desired.clone();
    out.quality_profile = desired
        .quality_profile
        .as_ref()
        .map(quality::normalize_desired)
        .transpose()?;
    Ok(out)
}

pub fn diff_with(
    current: &IR,
    desired: &IR,
    caps: &Capabilities,
    ownership: Ownership<'_>,
) -> Result<ChangeSet, DiffError> {
    let desired = prepare(desired)?;
    let (desired, held) = gate(desired, caps);

    let mut current = current.clone();
    current.quality_profile = current.quality_profile.as_ref().map(|q| {
        let mut q = quality::normalize_current(q);
        quality::gate(&mut q, caps);
        q
    });

    let mut planner = Planner {
        changes: ChangeSet::default(),
        ownership,
        held,
    };

    planner.quality(current.quality_profile.as_ref(), desired.quality_profile.as_ref());
    planner.list(&current.custom_formats, &desired.custom_formats);
    planner.list(&current.root_folders, &desired.root_folders);
    planner.list(&current.download_clients, &desired.download_clients);
    planner.list(&current.indexers, &desired.indexers);
    planner.list(&current.import_lists, &desired.import_lists);
    planner.list(&current.notifications, &desired.notifications);
    planner.list(&current.delay_profiles, &desired.delay_profiles);
    planner.list(&current.release_profiles, &desired.release_profiles);
    planner.singleton(
        ResourceKind::Naming,
        current.naming.as_ref(),
        desired.naming.as_ref(),
    );
    planner.singleton(
        ResourceKind::MediaManagement,
        current.media_management.as_ref(),
        desired.media_management.as_ref(),
    );
    planner.singleton(
        ResourceKind::Authentication,
        current.authentication.as_ref(),
        desired.authentication.as_ref(),
    );

    let mut changes = planner.changes;
    changes.sort();
    Ok(changes)
}

// ── Capability gating ────────────────────────────────────────────────

/// Keys removed from the desired state by gating. Held keys are neither
/// created, updated nor deleted.
#[derive(Debug, Default)]
struct Held {
    keys: BTreeSet<(ResourceKind, ResourceKey)>,
    quality_profile: bool,
}

impl Held {
    fn contains(&self, kind: ResourceKind, key: &ResourceKey) -> bool {
        if kind == ResourceKind::QualityProfile {
            return self.quality_profile;
        }
        self.keys.contains(&(kind, key.clone()))
    }
}

fn gate(mut desired: IR, caps: &Capabilities) -> (IR, Held) {
    let mut held = Held::default();

    if let Some(mut q) = desired.quality_profile.take() {
        if quality::gate(&mut q, caps) {
            desired.quality_profile = Some(q);
        } else {
            warn!(profile = %q.name, "no supported tiers left; holding quality profile");
            held.quality_profile = true;
        }
    }

    desired.download_clients.retain(|dc| {
        let ok = caps.supports_download_client(&dc.implementation);
        if !ok {
            warn!(
                name = %dc.name,
                implementation = %dc.implementation,
                "download client type not supported by backend; holding"
            );
            held.keys.insert((ResourceKind::DownloadClient, dc.key()));
        }
        ok
    });

    desired.indexers.retain(|ix| {
        let ok = caps.supports_indexer(&ix.implementation);
        if !ok {
            warn!(
                name = %ix.name,
                implementation = %ix.implementation,
                "indexer type not supported by backend; holding"
            );
            held.keys.insert((ResourceKind::Indexer, ix.key()));
        }
        ok
    });

    (desired, held)
}

// ── Planning ─────────────────────────────────────────────────────────

/// IR entry as a diff payload: serialized, without its backend `id`.
pub fn to_payload<T: Serialize>(item: &T) -> Value {
    let mut value = serde_json::to_value(item).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.remove("id");
    }
    value
}

struct Entry {
    id: Option<i64>,
    payload: Value,
}

struct Planner<'a> {
    changes: ChangeSet,
    ownership: Ownership<'a>,
    held: Held,
}

impl Planner<'_> {
    fn emit(
        &mut self,
        kind: ResourceKind,
        current: BTreeMap<ResourceKey, Entry>,
        desired: BTreeMap<ResourceKey, Entry>,
    ) {
        for (key, want) in &desired {
            if self.held.contains(kind, key) {
                continue;
            }
            match current.get(key) {
                None => self.changes.creates.push(Resource {
                    kind,
                    key: key.clone(),
                    id: None,
                    payload: want.payload.clone(),
                }),
                Some(have) if !payload_matches(&want.payload, &have.payload) => {
                    self.changes.updates.push(Resource {
                        kind,
                        key: key.clone(),
                        id: have.id,
                        payload: want.payload.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        for (key, have) in current {
            if !desired.contains_key(&key) && !self.held.contains(kind, &key) {
                self.changes.deletes.push(ResourceRef {
                    kind,
                    key,
                    id: have.id,
                });
            }
        }
    }

    fn list<T: Keyed>(&mut self, current: &[T], desired: &[T]) {
        let kind = T::KIND;
        let mut have = BTreeMap::new();
        let mut foreign = BTreeSet::new();
        for item in current {
            let key = item.key();
            if !self.ownership.owns(kind, item.name(), item.id()) {
                foreign.insert(key);
                continue;
            }
            if have.contains_key(&key) {
                // Owned duplicate of a key already kept.
                if let Some(id) = item.id() {
                    self.changes.deletes.push(ResourceRef {
                        kind,
                        key,
                        id: Some(id),
                    });
                }
                continue;
            }
            have.insert(
                key,
                Entry {
                    id: item.id(),
                    payload: to_payload(item),
                },
            );
        }
        // An unmanaged entry holds its key unless a managed one shares it.
        for key in foreign {
            if have.contains_key(&key) {
                continue;
            }
            if desired.iter().any(|d| d.key() == key) {
                warn!(%kind, %key, "key taken by an unmanaged resource; holding");
            }
            self.held.keys.insert((kind, key));
        }
        let want = desired
            .iter()
            .map(|item| {
                (
                    item.key(),
                    Entry {
                        id: None,
                        payload: to_payload(item),
                    },
                )
            })
            .collect();
        self.emit(kind, have, want);
    }

    /// The managed profile is keyed by its recorded ID so a rename is an
    /// update, not a delete plus create.
    fn quality(&mut self, current: Option<&QualityIR>, desired: Option<&QualityIR>) {
        let kind = ResourceKind::QualityProfile;
        if let (Some(have), Some(want)) = (current, desired) {
            if have.name == want.name && !self.ownership.owns(kind, Some(&have.name), have.id) {
                warn!(profile = %have.name, "quality profile name taken by an unmanaged profile; holding");
                self.held.quality_profile = true;
            }
        }
        let current = current.filter(|q| self.ownership.owns(kind, Some(&q.name), q.id));

        let current_key = current.map(|q| match q.id {
            Some(id) if self.ownership.recorded(kind, Some(id)) => ResourceKey::Id(id),
            _ => ResourceKey::Name(q.name.clone()),
        });
        let desired_key = desired.map(|q| match &current_key {
            Some(ResourceKey::Id(id)) => ResourceKey::Id(*id),
            _ => ResourceKey::Name(q.name.clone()),
        });

        let mut have = BTreeMap::new();
        if let (Some(q), Some(key)) = (current, current_key) {
            have.insert(
                key,
                Entry {
                    id: q.id,
                    payload: to_payload(q),
                },
            );
        }
        let mut want = BTreeMap::new();
        if let (Some(q), Some(key)) = (desired, desired_key) {
            want.insert(
                key,
                Entry {
                    id: None,
                    payload: to_payload(q),
                },
            );
        }
        self.emit(kind, have, want);
    }

    /// Singletons are only ever updated, and only when desired names them.
    fn singleton<T: Serialize>(&mut self, kind: ResourceKind, current: Option<&T>, desired: Option<&T>) {
        let Some(desired) = desired else {
            return;
        };
        let payload = to_payload(desired);
        let unchanged = current.is_some_and(|c| payload_matches(&payload, &to_payload(c)));
        if !unchanged {
            self.changes.updates.push(Resource {
                kind,
                key: ResourceKey::Name(kind.to_string()),
                id: None,
                payload,
            });
        }
    }
}
