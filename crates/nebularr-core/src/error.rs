// ── Core error types ──
//
// Errors surfaced by adapters, the diff engine and the orchestrator.
// Consumers never see raw HTTP failures: the `From<nebularr_api::Error>`
// impl translates wire-level errors into connection-class or item-class
// adapter errors.

use thiserror::Error;

use crate::adapter::BackendKind;
use crate::changeset::{ResourceKey, ResourceKind};
use crate::status::Phase;

/// Failure of a single adapter call.
#[derive(Debug, Error)]
pub enum AdapterError {
    // ── Connection-class ─────────────────────────────────────────────
    #[error("Cannot reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("TLS error: {reason}")]
    Tls { reason: String },

    #[error("Credential rejected: {message}")]
    CredentialRejected { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Reconcile deadline exceeded")]
    DeadlineExceeded,

    // ── Item-class ───────────────────────────────────────────────────
    #[error("Write rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Name conflict: {name} exists and is not managed")]
    Conflict { name: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl AdapterError {
    /// Worth retrying a read-only call for.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable { .. } | Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// The backend could not be talked to at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. }
                | Self::Tls { .. }
                | Self::CredentialRejected { .. }
                | Self::Timeout { .. }
                | Self::Cancelled
                | Self::DeadlineExceeded
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

// ── Conversion from wire-layer errors ────────────────────────────────

impl From<nebularr_api::Error> for AdapterError {
    fn from(err: nebularr_api::Error) -> Self {
        use nebularr_api::Error as Wire;

        match err {
            Wire::InvalidApiKey => AdapterError::CredentialRejected {
                message: "Invalid API key".into(),
            },
            Wire::Authentication { message } => AdapterError::CredentialRejected { message },
            Wire::Transport(ref e) => {
                if e.is_timeout() {
                    AdapterError::Timeout { timeout_secs: 0 }
                } else if let Some(status) = e.status() {
                    if status.as_u16() == 404 {
                        AdapterError::NotFound {
                            what: e.url().map(|u| u.path().to_owned()).unwrap_or_default(),
                        }
                    } else {
                        AdapterError::Rejected {
                            status: status.as_u16(),
                            message: e.to_string(),
                        }
                    }
                } else {
                    AdapterError::Unreachable {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                }
            }
            Wire::InvalidUrl(e) => AdapterError::Unreachable {
                url: String::new(),
                reason: format!("Invalid URL: {e}"),
            },
            Wire::Timeout { timeout_secs } => AdapterError::Timeout { timeout_secs },
            Wire::Tls(reason) => AdapterError::Tls { reason },
            Wire::Api {
                status: 404,
                message,
            } => AdapterError::NotFound { what: message },
            Wire::Api { status, message } => AdapterError::Rejected { status, message },
            Wire::Deserialization { message, body: _ } => AdapterError::Protocol { message },
        }
    }
}

/// The desired state contradicts itself and must be edited.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("quality profile {profile}: `preset` and `tiers` are mutually exclusive")]
    MutuallyExclusive { profile: String },

    #[error("quality profile {profile}: unknown preset `{preset}`")]
    UnknownPreset { profile: String, preset: String },

    #[error("quality profile {profile}: audio and video tiers cannot be mixed")]
    MixedMedia { profile: String },

    #[error("quality profile {profile}: cutoff {cutoff} is not an allowed tier")]
    InvalidCutoff { profile: String, cutoff: String },

    #[error("naming format `{field}` is malformed: {reason}")]
    MalformedTemplate { field: String, reason: String },

    #[error("duplicate {kind} `{key}` in desired state")]
    DuplicateKey { kind: ResourceKind, key: ResourceKey },

    #[error("{backend} does not manage {kind}")]
    UnsupportedKind {
        backend: BackendKind,
        kind: ResourceKind,
    },
}

/// Why a reconcile pass stopped.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{phase} failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: AdapterError,
    },

    #[error("desired state rejected: {0}")]
    Diff(#[from] DiffError),

    #[error("no adapter registered for backend {0}")]
    NoAdapter(BackendKind),

    #[error("reconcile task panicked: {0}")]
    Panicked(String),
}

impl ReconcileError {
    /// Transport-class failures back off exponentially. Rejected desired
    /// state requeues at the normal period.
    pub fn backs_off(&self) -> bool {
        matches!(self, Self::Phase { .. } | Self::Panicked(_))
    }

    /// Short machine-readable reason for the `Ready` condition.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Phase { phase, .. } => match phase {
                Phase::Connecting => "ConnectFailed",
                Phase::Discovering => "DiscoverFailed",
                Phase::ReadingState => "ReadStateFailed",
                Phase::Applying => "ApplyFailed",
                _ => "ReconcileFailed",
            },
            Self::Diff(_) => "InvalidSpec",
            Self::NoAdapter(_) => "NoAdapter",
            Self::Panicked(_) => "Panicked",
        }
    }
}

/// Persisting or loading an object status failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("status store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("status for {name} is unreadable: {message}")]
    Format { name: String, message: String },
}

/// Failure of the worker pool itself, as opposed to a reconcile.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("worker pool is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_errors_map_to_classes() {
        let err: AdapterError = nebularr_api::Error::InvalidApiKey.into();
        assert!(err.is_connectivity());

        let err: AdapterError = nebularr_api::Error::Api {
            status: 404,
            message: "gone".into(),
        }
        .into();
        assert!(err.is_not_found());

        let err: AdapterError = nebularr_api::Error::Api {
            status: 503,
            message: "busy".into(),
        }
        .into();
        assert!(err.is_transient());
        assert!(!err.is_connectivity());
    }

    #[test]
    fn diff_errors_do_not_back_off() {
        let err = ReconcileError::from(DiffError::MutuallyExclusive {
            profile: "hd".into(),
        });
        assert!(!err.backs_off());
        assert_eq!(err.reason(), "InvalidSpec");

        let err = ReconcileError::Phase {
            phase: Phase::Connecting,
            source: AdapterError::Cancelled,
        };
        assert!(err.backs_off());
        assert_eq!(err.reason(), "ConnectFailed");
    }
}
