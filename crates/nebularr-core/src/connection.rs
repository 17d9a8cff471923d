// ── Runtime connection configuration ──
//
// Describes how to reach one backend. Built by the config layer and handed
// to adapters with every call; core never reads config files.

use std::path::PathBuf;
use std::time::Duration;

use nebularr_api::{TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

/// Resolved credential for a backend.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Servarr `X-Api-Key`.
    ApiKey(SecretString),
    /// File backends and unauthenticated endpoints.
    None,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Everything an adapter needs to talk to one backend.
#[derive(Debug, Clone)]
pub struct ConnectionIR {
    pub url: Url,
    pub credential: Credential,
    /// Per-request timeout.
    pub timeout: Duration,
    pub tls: TlsVerification,
}

impl ConnectionIR {
    pub fn new(url: Url, credential: Credential) -> Self {
        Self {
            url,
            credential,
            timeout: Duration::from_secs(30),
            tls: TlsVerification::default(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        }
    }
}
