// ── Intermediate representation ──
//
// Backend-agnostic snapshot of a backend's configuration. The same type
// holds the desired state (loaded from TOML/YAML) and the owned slice of the
// live state read by an adapter. List order is preserved for display but is
// irrelevant to diffing: entries are keyed by stable identity.

pub mod format;
pub mod provider;
pub mod quality;
pub mod settings;

use serde::{Deserialize, Serialize};

use crate::changeset::{ResourceKey, ResourceKind};

pub use format::{CustomFormatIR, DelayProfileIR, FormatSpecIR, ReleaseProfileIR};
pub use provider::{DownloadClientIR, ImportListIR, IndexerIR, NotificationIR};
pub use quality::QualityIR;
pub use settings::{AuthenticationIR, MediaManagementIR, NamingIR};

/// Normalized configuration of one backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IR {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_profile: Option<QualityIR>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub naming: Option<NamingIR>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_management: Option<MediaManagementIR>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationIR>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub download_clients: Vec<DownloadClientIR>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indexers: Vec<IndexerIR>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub import_lists: Vec<ImportListIR>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<NotificationIR>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_formats: Vec<CustomFormatIR>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delay_profiles: Vec<DelayProfileIR>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub release_profiles: Vec<ReleaseProfileIR>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub root_folders: Vec<RootFolderIR>,
}

/// A library root. Keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootFolderIR {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub path: String,
    /// Lidarr only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl IR {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A list entry with a stable identity.
pub trait Keyed: Serialize {
    const KIND: ResourceKind;

    fn key(&self) -> ResourceKey;

    fn id(&self) -> Option<i64>;

    /// Name used for prefix-based ownership, if the kind has one.
    fn name(&self) -> Option<&str> {
        None
    }
}

macro_rules! keyed_by_name {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Keyed for $ty {
                const KIND: ResourceKind = ResourceKind::$kind;

                fn key(&self) -> ResourceKey {
                    ResourceKey::Name(self.name.clone())
                }

                fn id(&self) -> Option<i64> {
                    self.id
                }

                fn name(&self) -> Option<&str> {
                    Some(&self.name)
                }
            }
        )*
    };
}

keyed_by_name! {
    CustomFormatIR => CustomFormat,
    DownloadClientIR => DownloadClient,
    IndexerIR => Indexer,
    ImportListIR => ImportList,
    NotificationIR => Notification,
    ReleaseProfileIR => ReleaseProfile,
}

impl Keyed for DelayProfileIR {
    const KIND: ResourceKind = ResourceKind::DelayProfile;

    fn key(&self) -> ResourceKey {
        ResourceKey::Name(DelayProfileIR::key(self))
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Keyed for RootFolderIR {
    const KIND: ResourceKind = ResourceKind::RootFolder;

    fn key(&self) -> ResourceKey {
        let trimmed = self.path.trim_end_matches(['/', '\\']);
        if trimmed.is_empty() {
            ResourceKey::Name(self.path.clone())
        } else {
            ResourceKey::Name(trimmed.to_owned())
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}
