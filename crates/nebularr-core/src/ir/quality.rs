// Quality profile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tier::{MediaKind, Tier};

/// A quality profile expressed in canonical tiers.
///
/// Desired profiles name either a `preset` or an explicit `tiers` list.
/// After normalization `tiers` holds the allowed tiers, best first, and
/// `cutoff` is always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityIR {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    /// Inferred from `tiers` when absent; video otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<Tier>,
    #[serde(default = "default_true")]
    pub upgrade_allowed: bool,
    /// Upgrade until this tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<Tier>,
    #[serde(default)]
    pub min_format_score: i32,
    #[serde(default)]
    pub cutoff_format_score: i32,
    /// Custom format name → score. Zero scores are dropped on normalization.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub format_scores: BTreeMap<String, i32>,
}

fn default_true() -> bool {
    true
}

impl QualityIR {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            media: None,
            preset: None,
            tiers: Vec::new(),
            upgrade_allowed: true,
            cutoff: None,
            min_format_score: 0,
            cutoff_format_score: 0,
            format_scores: BTreeMap::new(),
        }
    }

    /// Declared media, else the media of the first tier, else video.
    pub fn effective_media(&self) -> MediaKind {
        self.media
            .or_else(|| self.tiers.first().map(|t| t.media()))
            .unwrap_or(MediaKind::Video)
    }
}
