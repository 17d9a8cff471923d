// Servarr wire types
//
// Only the shapes the reconciler reads structurally are typed here. Managed
// resources travel as raw `serde_json::Value` so fields this crate does not
// know about survive a GET → merge → PUT round-trip untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /system/status`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub instance_name: Option<String>,
    pub version: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

/// One entry of `GET /health`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    #[serde(default)]
    pub source: Option<String>,
    /// `ok`, `notice`, `warning` or `error`.
    #[serde(rename = "type")]
    pub check_type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub wiki_url: Option<String>,
}

/// The quality a definition describes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quality {
    pub id: i64,
    pub name: String,
    /// Video flavors only: `bluray`, `webdl`, `webrip`, `television`, `dvd`, ...
    #[serde(default)]
    pub source: Option<String>,
    /// Vertical resolution; `0` for unknown and for audio qualities.
    #[serde(default)]
    pub resolution: Option<i32>,
    /// Radarr only: `remux`, `brdisk`, `rawhd`, `none`.
    #[serde(default)]
    pub modifier: Option<String>,
}

/// `GET /qualitydefinition`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityDefinition {
    pub id: i64,
    pub quality: Quality,
    #[serde(default)]
    pub title: Option<String>,
}

/// A `{name, value}` entry of a provider's `fields` array.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One entry of `GET /{provider}/schema`.
///
/// The full object doubles as the creation template for that
/// implementation, so unknown keys are preserved in `extra`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSchema {
    pub implementation: String,
    #[serde(default)]
    pub implementation_name: Option<String>,
    #[serde(default)]
    pub config_contract: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Prowlarr `GET /applications` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub name: String,
    pub implementation: String,
    #[serde(default)]
    pub sync_level: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Application {
    /// Value of a named field, if present and a string.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.value.as_ref())
            .and_then(Value::as_str)
    }
}

/// A Servarr validation failure entry (HTTP 400 body).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValidationFailure {
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}
