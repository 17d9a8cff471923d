// Custom formats, delay profiles and release profiles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFormatIR {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(
        default,
        rename = "includeCustomFormatWhenRenaming",
        skip_serializing_if = "Option::is_none"
    )]
    pub include_when_renaming: Option<bool>,
    #[serde(default)]
    pub specifications: Vec<FormatSpecIR>,
}

/// One matching condition of a custom format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatSpecIR {
    pub name: String,
    /// e.g. `ReleaseTitleSpecification`, `SourceSpecification`.
    pub implementation: String,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
}

/// Delay profiles carry no name and are keyed by `order`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayProfileIR {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_usenet: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_torrent: Option<bool>,
    /// `usenet` or `torrent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_protocol: Option<String>,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usenet_delay: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_delay: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass_if_highest_quality: Option<bool>,
}

impl DelayProfileIR {
    /// Stable key used for diffing.
    pub fn key(&self) -> String {
        format!("delay-{}", self.order)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseProfileIR {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Terms a release must contain.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Terms a release must not contain.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_id: Option<i64>,
}
