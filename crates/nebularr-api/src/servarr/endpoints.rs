// Typed endpoint methods for `ServarrClient`.

use serde_json::Value;

use super::client::ServarrClient;
use super::models::{Application, HealthCheck, ProviderSchema, QualityDefinition, SystemStatus};
use crate::error::Error;

/// A list-style resource endpoint (`GET /x`, `POST /x`, `PUT /x/{id}`, `DELETE /x/{id}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    QualityProfile,
    CustomFormat,
    DownloadClient,
    Indexer,
    ImportList,
    Notification,
    DelayProfile,
    ReleaseProfile,
    RootFolder,
    Application,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::QualityProfile => "qualityprofile",
            Self::CustomFormat => "customformat",
            Self::DownloadClient => "downloadclient",
            Self::Indexer => "indexer",
            Self::ImportList => "importlist",
            Self::Notification => "notification",
            Self::DelayProfile => "delayprofile",
            Self::ReleaseProfile => "releaseprofile",
            Self::RootFolder => "rootfolder",
            Self::Application => "applications",
        }
    }

    /// Provider endpoints expose `/schema` and validate on save.
    pub fn is_provider(self) -> bool {
        matches!(
            self,
            Self::DownloadClient
                | Self::Indexer
                | Self::ImportList
                | Self::Notification
                | Self::Application
        )
    }
}

/// A singleton settings endpoint under `/config/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigEndpoint {
    Naming,
    MediaManagement,
    Host,
}

impl ConfigEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Naming => "config/naming",
            Self::MediaManagement => "config/mediamanagement",
            Self::Host => "config/host",
        }
    }
}

/// Providers are validated against the remote (e.g. a download client
/// connection test) unless saved with `forceSave`.
fn save_params(endpoint: Endpoint) -> &'static [(&'static str, &'static str)] {
    if endpoint.is_provider() {
        &[("forceSave", "true")]
    } else {
        &[]
    }
}

impl ServarrClient {
    // ── System ───────────────────────────────────────────────────────

    pub async fn system_status(&self) -> Result<SystemStatus, Error> {
        self.get("system/status").await
    }

    pub async fn health(&self) -> Result<Vec<HealthCheck>, Error> {
        self.get("health").await
    }

    pub async fn quality_definitions(&self) -> Result<Vec<QualityDefinition>, Error> {
        self.get("qualitydefinition").await
    }

    /// Implementation templates for a provider endpoint.
    pub async fn schema(&self, endpoint: Endpoint) -> Result<Vec<ProviderSchema>, Error> {
        self.get(&format!("{}/schema", endpoint.path())).await
    }

    /// Default object for a non-provider endpoint (`GET /qualityprofile/schema`).
    pub async fn template(&self, endpoint: Endpoint) -> Result<Value, Error> {
        self.get(&format!("{}/schema", endpoint.path())).await
    }

    // ── Resources ────────────────────────────────────────────────────

    pub async fn list(&self, endpoint: Endpoint) -> Result<Vec<Value>, Error> {
        self.get(endpoint.path()).await
    }

    pub async fn get_one(&self, endpoint: Endpoint, id: i64) -> Result<Value, Error> {
        self.get(&format!("{}/{id}", endpoint.path())).await
    }

    /// Create a resource; returns the stored object (with its new `id`).
    pub async fn create(&self, endpoint: Endpoint, body: &Value) -> Result<Value, Error> {
        self.post(endpoint.path(), save_params(endpoint), body).await
    }

    pub async fn update(&self, endpoint: Endpoint, id: i64, body: &Value) -> Result<Value, Error> {
        self.put(&format!("{}/{id}", endpoint.path()), save_params(endpoint), body)
            .await
    }

    pub async fn delete_one(&self, endpoint: Endpoint, id: i64) -> Result<(), Error> {
        self.delete(&format!("{}/{id}", endpoint.path())).await
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub async fn get_config(&self, endpoint: ConfigEndpoint) -> Result<Value, Error> {
        self.get(endpoint.path()).await
    }

    /// Settings singletons are written back by their own `id`.
    pub async fn put_config(&self, endpoint: ConfigEndpoint, body: &Value) -> Result<Value, Error> {
        let id = body.get("id").and_then(Value::as_i64).unwrap_or(1);
        self.put(&format!("{}/{id}", endpoint.path()), &[], body).await
    }

    // ── Prowlarr ─────────────────────────────────────────────────────

    pub async fn applications(&self) -> Result<Vec<Application>, Error> {
        self.get(Endpoint::Application.path()).await
    }
}
