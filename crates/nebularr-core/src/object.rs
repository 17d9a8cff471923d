// ── Managed object ──
//
// One desired state bound to one backend: the unit the orchestrator
// reconciles and the worker pool serializes.

use serde::Serialize;
use url::Url;

use crate::adapter::BackendKind;
use crate::connection::ConnectionIR;
use crate::drift;
use crate::ir::IR;

/// Pointer to the Prowlarr instance a downstream application syncs from.
#[derive(Debug, Clone)]
pub struct ProwlarrRef {
    pub name: String,
    pub connection: ConnectionIR,
}

#[derive(Debug, Clone)]
pub struct ManagedObject {
    pub name: String,
    /// Bumped on every edit of the desired state.
    pub generation: i64,
    /// Skip reconciling entirely.
    pub suspend: bool,
    pub backend: BackendKind,
    pub connection: ConnectionIR,
    pub desired: IR,
    pub prowlarr: Option<ProwlarrRef>,
}

/// Secret-free projection of a managed object that the fingerprint covers.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintView<'a> {
    backend: BackendKind,
    url: &'a Url,
    desired: &'a IR,
    #[serde(skip_serializing_if = "Option::is_none")]
    prowlarr: Option<ProwlarrView<'a>>,
}

#[derive(Serialize)]
struct ProwlarrView<'a> {
    name: &'a str,
    url: &'a Url,
}

impl ManagedObject {
    /// Drift fingerprint of the desired spec.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        drift::fingerprint(&FingerprintView {
            backend: self.backend,
            url: &self.connection.url,
            desired: &self.desired,
            prowlarr: self.prowlarr.as_ref().map(|p| ProwlarrView {
                name: &p.name,
                url: &p.connection.url,
            }),
        })
    }
}
