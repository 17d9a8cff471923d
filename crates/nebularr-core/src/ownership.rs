// ── Ownership tracking ──
//
// A resource may be touched only if this system created it (its backend ID
// is recorded here) or its name carries the managed prefix. Everything else
// is invisible to diff and apply.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::changeset::{ApplyResult, ResourceKind};

/// Names starting with this prefix are owned without a recorded ID.
pub const MANAGED_PREFIX: &str = "nebularr-";

pub fn has_managed_prefix(name: &str) -> bool {
    name.starts_with(MANAGED_PREFIX)
}

/// Backend IDs created by this system. Persisted on the object's status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_profile_id: Option<i64>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub custom_format_ids: BTreeSet<i64>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub download_client_ids: BTreeSet<i64>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub indexer_ids: BTreeSet<i64>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub import_list_ids: BTreeSet<i64>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub notification_ids: BTreeSet<i64>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub delay_profile_ids: BTreeSet<i64>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub release_profile_ids: BTreeSet<i64>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub root_folder_ids: BTreeSet<i64>,
}

impl ManagedResources {
    fn set(&self, kind: ResourceKind) -> Option<&BTreeSet<i64>> {
        match kind {
            ResourceKind::CustomFormat => Some(&self.custom_format_ids),
            ResourceKind::DownloadClient => Some(&self.download_client_ids),
            ResourceKind::Indexer => Some(&self.indexer_ids),
            ResourceKind::ImportList => Some(&self.import_list_ids),
            ResourceKind::Notification => Some(&self.notification_ids),
            ResourceKind::DelayProfile => Some(&self.delay_profile_ids),
            ResourceKind::ReleaseProfile => Some(&self.release_profile_ids),
            ResourceKind::RootFolder => Some(&self.root_folder_ids),
            ResourceKind::QualityProfile
            | ResourceKind::Naming
            | ResourceKind::MediaManagement
            | ResourceKind::Authentication => None,
        }
    }

    fn set_mut(&mut self, kind: ResourceKind) -> Option<&mut BTreeSet<i64>> {
        match kind {
            ResourceKind::CustomFormat => Some(&mut self.custom_format_ids),
            ResourceKind::DownloadClient => Some(&mut self.download_client_ids),
            ResourceKind::Indexer => Some(&mut self.indexer_ids),
            ResourceKind::ImportList => Some(&mut self.import_list_ids),
            ResourceKind::Notification => Some(&mut self.notification_ids),
            ResourceKind::DelayProfile => Some(&mut self.delay_profile_ids),
            ResourceKind::ReleaseProfile => Some(&mut self.release_profile_ids),
            ResourceKind::RootFolder => Some(&mut self.root_folder_ids),
            ResourceKind::QualityProfile
            | ResourceKind::Naming
            | ResourceKind::MediaManagement
            | ResourceKind::Authentication => None,
        }
    }

    /// Whether `id` of `kind` is recorded.
    pub fn contains(&self, kind: ResourceKind, id: i64) -> bool {
        match kind {
            ResourceKind::QualityProfile => self.quality_profile_id == Some(id),
            _ => self.set(kind).is_some_and(|ids| ids.contains(&id)),
        }
    }

    pub fn record(&mut self, kind: ResourceKind, id: i64) {
        if kind == ResourceKind::QualityProfile {
            self.quality_profile_id = Some(id);
        } else if let Some(ids) = self.set_mut(kind) {
            ids.insert(id);
        }
    }

    pub fn release(&mut self, kind: ResourceKind, id: i64) {
        if kind == ResourceKind::QualityProfile {
            if self.quality_profile_id == Some(id) {
                self.quality_profile_id = None;
            }
        } else if let Some(ids) = self.set_mut(kind) {
            ids.remove(&id);
        }
    }

    /// Ownership proof: a recorded ID or a prefixed name. Singletons are
    /// always writable.
    pub fn owns(&self, kind: ResourceKind, name: Option<&str>, id: Option<i64>) -> bool {
        kind.is_singleton()
            || id.is_some_and(|id| self.contains(kind, id))
            || name.is_some_and(has_managed_prefix)
    }

    /// Fold an apply's ownership delta in. Releases happen only for
    /// confirmed deletes, so a failed item never loses track of ownership.
    pub fn absorb(&mut self, result: &ApplyResult) {
        for r in &result.recorded {
            if let Some(id) = r.id {
                self.record(r.kind, id);
            }
        }
        for r in &result.released {
            if let Some(id) = r.id {
                self.release(r.kind, id);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Number of recorded IDs across all kinds.
    pub fn len(&self) -> usize {
        usize::from(self.quality_profile_id.is_some())
            + self.custom_format_ids.len()
            + self.download_client_ids.len()
            + self.indexer_ids.len()
            + self.import_list_ids.len()
            + self.notification_ids.len()
            + self.delay_profile_ids.len()
            + self.release_profile_ids.len()
            + self.root_folder_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::{ResourceKey, ResourceRef};

    #[test]
    fn prefix_or_recorded_id_proves_ownership() {
        let mut owned = ManagedResources::default();
        owned.record(ResourceKind::DownloadClient, 4);

        assert!(owned.owns(ResourceKind::DownloadClient, Some("anything"), Some(4)));
        assert!(owned.owns(ResourceKind::DownloadClient, Some("nebularr-qbit"), Some(9)));
        assert!(!owned.owns(ResourceKind::DownloadClient, Some("qbit"), Some(9)));
        assert!(!owned.owns(ResourceKind::Indexer, Some("qbit"), Some(4)));
        assert!(owned.owns(ResourceKind::Naming, None, None));
    }

    #[test]
    fn quality_profile_is_a_single_id() {
        let mut owned = ManagedResources::default();
        owned.record(ResourceKind::QualityProfile, 12);
        assert!(owned.contains(ResourceKind::QualityProfile, 12));
        owned.release(ResourceKind::QualityProfile, 3);
        assert_eq!(owned.quality_profile_id, Some(12));
        owned.release(ResourceKind::QualityProfile, 12);
        assert!(owned.is_empty());
    }

    #[test]
    fn absorb_applies_delta() {
        let mut owned = ManagedResources::default();
        owned.record(ResourceKind::Indexer, 1);
        let result = ApplyResult {
            applied: 2,
            recorded: vec![ResourceRef {
                kind: ResourceKind::CustomFormat,
                key: ResourceKey::name("x265"),
                id: Some(30),
            }],
            released: vec![ResourceRef {
                kind: ResourceKind::Indexer,
                key: ResourceKey::name("old"),
                id: Some(1),
            }],
            ..ApplyResult::default()
        };
        owned.absorb(&result);
        assert!(owned.contains(ResourceKind::CustomFormat, 30));
        assert!(!owned.contains(ResourceKind::Indexer, 1));
        assert_eq!(owned.len(), 1);
    }
}
