// ── Change sets and apply results ──

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString};

/// Resource kinds, in dependency order: a kind may reference only kinds
/// declared before it, so sorting by kind yields a safe create order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResourceKind {
    CustomFormat,
    QualityProfile,
    RootFolder,
    DownloadClient,
    Indexer,
    ImportList,
    Notification,
    DelayProfile,
    ReleaseProfile,
    Naming,
    MediaManagement,
    Authentication,
}

impl ResourceKind {
    /// Settings that always exist once per backend.
    pub fn is_singleton(self) -> bool {
        matches!(
            self,
            Self::Naming | Self::MediaManagement | Self::Authentication
        )
    }
}

/// Stable identity of a resource within its kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceKey {
    /// Recorded backend ID (the managed quality profile).
    Id(i64),
    /// Name, path, or synthesized key.
    Name(String),
}

impl ResourceKey {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            Self::Id(_) => None,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A resource to create or update. `payload` is the IR entry as JSON,
/// without its `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub key: ResourceKey,
    /// Backend ID, known for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub payload: Value,
}

impl Resource {
    pub fn to_ref(&self) -> ResourceRef {
        ResourceRef {
            kind: self.kind,
            key: self.key.clone(),
            id: self.id,
        }
    }

    /// `name` from the payload, falling back to a name key.
    pub fn name(&self) -> Option<&str> {
        self.payload
            .get("name")
            .and_then(Value::as_str)
            .or_else(|| self.key.as_name())
    }
}

/// Identity of a resource without its content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub key: ResourceKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.key)
    }
}

/// Everything needed to move the live state to the desired state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub creates: Vec<Resource>,
    pub updates: Vec<Resource>,
    pub deletes: Vec<ResourceRef>,
}

impl ChangeSet {
    pub fn total_changes(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }

    /// Order by kind, then key.
    pub fn sort(&mut self) {
        self.creates
            .sort_by(|a, b| (a.kind, &a.key).cmp(&(b.kind, &b.key)));
        self.updates
            .sort_by(|a, b| (a.kind, &a.key).cmp(&(b.kind, &b.key)));
        self.deletes.sort();
    }
}

/// One item that failed to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyItemError {
    pub resource: ResourceRef,
    pub cause: String,
}

/// Outcome of applying a `ChangeSet`.
///
/// `applied + failed + skipped` always equals the number of items the
/// change set held. `recorded` and `released` carry the ownership delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApplyItemError>,
    /// Identities created by this apply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recorded: Vec<ResourceRef>,
    /// Identities confirmed deleted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub released: Vec<ResourceRef>,
    /// The context finished before every item was attempted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interrupted: bool,
}

impl ApplyResult {
    pub fn total(&self) -> usize {
        self.applied + self.failed + self.skipped
    }

    /// Every item was attempted and none failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(kind: ResourceKind, key: &str) -> Resource {
        Resource {
            kind,
            key: ResourceKey::name(key),
            id: None,
            payload: Value::Null,
        }
    }

    #[test]
    fn sort_orders_by_kind_then_key() {
        let mut cs = ChangeSet {
            creates: vec![
                res(ResourceKind::DownloadClient, "b"),
                res(ResourceKind::CustomFormat, "z"),
                res(ResourceKind::DownloadClient, "a"),
            ],
            ..ChangeSet::default()
        };
        cs.sort();
        let keys: Vec<String> = cs.creates.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(keys, ["z", "a", "b"]);
    }

    #[test]
    fn kind_strings_are_kebab_case() {
        assert_eq!(ResourceKind::DownloadClient.to_string(), "download-client");
        assert_eq!(
            "quality-profile".parse::<ResourceKind>().ok(),
            Some(ResourceKind::QualityProfile)
        );
        assert!(ResourceKind::Naming.is_singleton());
        assert!(!ResourceKind::Indexer.is_singleton());
    }

    #[test]
    fn key_serializes_untagged() {
        assert_eq!(serde_json::to_string(&ResourceKey::Id(12)).ok().as_deref(), Some("12"));
        assert_eq!(
            serde_json::to_string(&ResourceKey::name("x")).ok().as_deref(),
            Some("\"x\"")
        );
    }
}
