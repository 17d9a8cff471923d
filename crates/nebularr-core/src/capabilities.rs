// ── Capability registry ──
//
// What one backend supports, discovered fresh on every reconcile. An empty
// set means the backend does not report that dimension; nothing is gated on
// it. Comparisons are case-insensitive.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tier::{Resolution, SourceClass, Tier};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub discovered_at: DateTime<Utc>,
    /// e.g. `1080`, `2160`.
    pub resolutions: BTreeSet<String>,
    /// Canonical source classes, e.g. `bluray`, `webdl`.
    pub sources: BTreeSet<String>,
    /// Download client implementations, lowercased.
    pub download_client_types: BTreeSet<String>,
    /// Indexer implementations, lowercased.
    pub indexer_types: BTreeSet<String>,
}

fn gate(set: &BTreeSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(&value.to_ascii_lowercase())
}

impl Capabilities {
    /// Nothing reported: every dimension ungated.
    pub fn unrestricted(discovered_at: DateTime<Utc>) -> Self {
        Self {
            discovered_at,
            resolutions: BTreeSet::new(),
            sources: BTreeSet::new(),
            download_client_types: BTreeSet::new(),
            indexer_types: BTreeSet::new(),
        }
    }

    pub fn add_resolution(&mut self, resolution: Resolution) {
        self.resolutions.insert(resolution.to_string());
    }

    pub fn add_source(&mut self, source: SourceClass) {
        self.sources.insert(source.to_string());
    }

    pub fn add_download_client_type(&mut self, implementation: &str) {
        self.download_client_types
            .insert(implementation.to_ascii_lowercase());
    }

    pub fn add_indexer_type(&mut self, implementation: &str) {
        self.indexer_types.insert(implementation.to_ascii_lowercase());
    }

    pub fn supports_tier(&self, tier: Tier) -> bool {
        match tier {
            Tier::Audio(_) => true,
            Tier::Video { resolution, source } => {
                gate(&self.resolutions, &resolution.to_string())
                    && gate(&self.sources, &source.to_string())
            }
        }
    }

    pub fn supports_download_client(&self, implementation: &str) -> bool {
        gate(&self.download_client_types, implementation)
    }

    pub fn supports_indexer(&self, implementation: &str) -> bool {
        gate(&self.indexer_types, implementation)
    }
}
