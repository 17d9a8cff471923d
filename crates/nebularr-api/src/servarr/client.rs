// Async HTTP client for the Servarr REST API.
//
// Base path: /api/v3/ (Radarr, Sonarr) or /api/v1/ (Lidarr, Prowlarr)
// Auth: X-Api-Key header

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::models::ValidationFailure;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Which REST API generation a service speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V3,
}

impl ApiVersion {
    /// Path segment inserted after the base URL.
    pub fn path_prefix(self) -> &'static str {
        match self {
            Self::V1 => "api/v1/",
            Self::V3 => "api/v3/",
        }
    }
}

/// Async client for one Servarr service.
///
/// Cheap to build; the reconciler constructs one per connection and never
/// shares it between managed objects.
pub struct ServarrClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl ServarrClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `X-Api-Key` as a default header on every request.
    pub fn from_api_key(
        base_url: &Url,
        api_key: &SecretString,
        version: ApiVersion,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_value.set_sensitive(true);
        headers.insert("X-Api-Key", key_value);

        let http = transport.build_client_with_headers(headers)?;
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url, version)?,
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        base_url: &Url,
        http: reqwest::Client,
        version: ApiVersion,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url, version)?,
            timeout_secs: 0,
        })
    }

    /// Append the API prefix, tolerating a URL base (`https://host/radarr`).
    fn normalize_base_url(raw: &Url, version: ApiVersion) -> Result<Url, Error> {
        let mut url = raw.clone();
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url.join(version.path_prefix())?)
    }

    /// The API root, e.g. `https://host:7878/api/v3/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await.map_err(|e| self.map_send(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url} params={params:?}");

        let resp = self
            .http
            .post(url)
            .query(params)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url} params={params:?}");

        let resp = self
            .http
            .put(url)
            .query(params)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await.map_err(|e| self.map_send(e))?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    fn map_send(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::InvalidApiKey;
        }

        let raw = resp.text().await.unwrap_or_default();
        Error::Api {
            status: status.as_u16(),
            message: describe_error_body(&raw).unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            }),
        }
    }
}

/// Extract a readable message from a Servarr error body.
///
/// Handles both validation arrays and `{"message": "..."}` objects.
fn describe_error_body(raw: &str) -> Option<String> {
    if let Ok(failures) = serde_json::from_str::<Vec<ValidationFailure>>(raw) {
        let parts: Vec<String> = failures
            .into_iter()
            .filter_map(|f| match (f.property_name, f.error_message) {
                (Some(p), Some(m)) if !p.is_empty() => Some(format!("{p}: {m}")),
                (_, Some(m)) => Some(m),
                _ => None,
            })
            .collect();
        if !parts.is_empty() {
            return Some(parts.join("; "));
        }
    }

    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_version_prefix() {
        let raw = Url::parse("http://radarr:7878").unwrap();
        let url = ServarrClient::normalize_base_url(&raw, ApiVersion::V3).unwrap();
        assert_eq!(url.as_str(), "http://radarr:7878/api/v3/");
    }

    #[test]
    fn base_url_keeps_url_base() {
        let raw = Url::parse("https://media.example/lidarr/").unwrap();
        let url = ServarrClient::normalize_base_url(&raw, ApiVersion::V1).unwrap();
        assert_eq!(url.as_str(), "https://media.example/lidarr/api/v1/");
    }

    #[test]
    fn validation_body_is_joined() {
        let raw = r#"[{"propertyName":"Host","errorMessage":"Must be set"},{"propertyName":"","errorMessage":"Test failed"}]"#;
        assert_eq!(
            describe_error_body(raw).as_deref(),
            Some("Host: Must be set; Test failed")
        );
    }

    #[test]
    fn message_body_is_extracted() {
        assert_eq!(
            describe_error_body(r#"{"message":"NotFound"}"#).as_deref(),
            Some("NotFound")
        );
        assert_eq!(describe_error_body("plain text"), None);
    }
}
