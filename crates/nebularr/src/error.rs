//! CLI error types with miette diagnostics.
//!
//! Maps config, adapter and reconcile errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use nebularr_config::ConfigError;
use nebularr_core::{AdapterError, PoolError, ReconcileError, StoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// At least one instance did not reach `Ready`.
    pub const NOT_RECONCILED: i32 = 10;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to '{instance}': {message}")]
    #[diagnostic(
        code(nebularr::connection_failed),
        help(
            "Check that the service is running and reachable from here.\n\
             Try: nebularr health {instance} -vv"
        )
    )]
    ConnectionFailed { instance: String, message: String },

    #[error("TLS verification failed for '{instance}': {message}")]
    #[diagnostic(
        code(nebularr::tls_error),
        help("Set `insecure = true` or `ca_cert` on the instance profile.")
    )]
    TlsError { instance: String, message: String },

    #[error("Request to '{instance}' timed out")]
    #[diagnostic(
        code(nebularr::timeout),
        help("Raise `timeout` on the instance profile or check service responsiveness.")
    )]
    Timeout { instance: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("API key rejected by '{instance}'")]
    #[diagnostic(
        code(nebularr::auth_failed),
        help("The key is under Settings > General > Security in the service UI.")
    )]
    AuthFailed { instance: String },

    #[error("No credentials configured for instance '{instance}'")]
    #[diagnostic(
        code(nebularr::no_credentials),
        help(
            "Set `api_key_env` on the instance, store the key in the system keyring\n\
             (service `nebularr`, user `{instance}/api-key`), or set `api_key`."
        )
    )]
    NoCredentials { instance: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Instance '{name}' not found in configuration")]
    #[diagnostic(code(nebularr::unknown_instance), help("Configured instances: {available}"))]
    UnknownInstance { name: String, available: String },

    #[error("No instances configured")]
    #[diagnostic(
        code(nebularr::no_instances),
        help("Add an [instances.<name>] table to {path}")
    )]
    NoInstances { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nebularr::validation))]
    Validation { field: String, reason: String },

    #[error("Cannot load desired state {path}: {message}")]
    #[diagnostic(code(nebularr::desired_state))]
    DesiredState { path: String, message: String },

    #[error("Configuration could not be loaded: {message}")]
    #[diagnostic(code(nebularr::config))]
    Config { message: String },

    // ── Reconcile ────────────────────────────────────────────────────
    #[error("Desired state for '{instance}' is invalid: {message}")]
    #[diagnostic(code(nebularr::invalid_spec), help("Fix the desired-state file and retry."))]
    InvalidSpec { instance: String, message: String },

    #[error("{operation} is not supported by '{instance}'")]
    #[diagnostic(code(nebularr::unsupported))]
    Unsupported { instance: String, operation: String },

    #[error("'{instance}' failed: {message}")]
    #[diagnostic(code(nebularr::backend))]
    Backend { instance: String, message: String },

    #[error("{failed} of {total} instances did not reconcile")]
    #[diagnostic(
        code(nebularr::not_reconciled),
        help("Run: nebularr status <instance> for conditions and messages")
    )]
    NotReconciled { failed: usize, total: usize },

    // ── Status store / IO ─────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(nebularr::status_store))]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(nebularr::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::UnknownInstance { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::NoInstances { .. }
            | Self::InvalidSpec { .. }
            | Self::DesiredState { .. } => exit_code::USAGE,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::NotReconciled { .. } => exit_code::NOT_RECONCILED,
            _ => exit_code::GENERAL,
        }
    }

    /// Attribute an adapter error to `instance`.
    pub fn adapter(instance: &str, err: AdapterError) -> Self {
        let instance = instance.to_owned();
        match err {
            AdapterError::Unreachable { .. } => Self::ConnectionFailed {
                instance,
                message: err.to_string(),
            },
            AdapterError::Tls { reason } => Self::TlsError {
                instance,
                message: reason,
            },
            AdapterError::Timeout { .. } | AdapterError::DeadlineExceeded => {
                Self::Timeout { instance }
            }
            AdapterError::CredentialRejected { .. } => Self::AuthFailed { instance },
            AdapterError::Unsupported { operation } => Self::Unsupported {
                instance,
                operation,
            },
            other => Self::Backend {
                instance,
                message: other.to_string(),
            },
        }
    }

    pub fn reconcile(instance: &str, err: ReconcileError) -> Self {
        match err {
            ReconcileError::Phase { source, .. } => Self::adapter(instance, source),
            ReconcileError::Diff(e) => Self::InvalidSpec {
                instance: instance.to_owned(),
                message: e.to_string(),
            },
            other => Self::Backend {
                instance: instance.to_owned(),
                message: other.to_string(),
            },
        }
    }

    /// Enrich an unknown-instance error with the configured names.
    pub fn with_available(self, names: &[&str]) -> Self {
        match self {
            Self::UnknownInstance { name, .. } => Self::UnknownInstance {
                name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            },
            other => other,
        }
    }
}

// ── ConfigError / PoolError → CliError mapping ───────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { instance } => Self::NoCredentials { instance },
            ConfigError::UnknownInstance { name } => Self::UnknownInstance {
                name,
                available: String::new(),
            },
            ConfigError::Desired { path, message } => Self::DesiredState {
                path: path.display().to_string(),
                message,
            },
            ConfigError::Figment(e) => Self::Config {
                message: e.to_string(),
            },
            ConfigError::Io(e) => Self::Io(e),
        }
    }
}

impl From<PoolError> for CliError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Store(e) => Self::Store(e),
            PoolError::Closed => Self::Backend {
                instance: "*".into(),
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebularr_core::Phase;

    #[test]
    fn connect_failures_exit_with_connection_code() {
        let err = CliError::reconcile(
            "movies",
            ReconcileError::Phase {
                phase: Phase::Connecting,
                source: AdapterError::Unreachable {
                    url: "http://radarr:7878".into(),
                    reason: "connection refused".into(),
                },
            },
        );
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn rejected_keys_exit_with_auth_code() {
        let err = CliError::adapter(
            "movies",
            AdapterError::CredentialRejected {
                message: "Invalid API key".into(),
            },
        );
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn unknown_instance_lists_alternatives() {
        let err = CliError::from(ConfigError::UnknownInstance {
            name: "film".into(),
        })
        .with_available(&["movies", "shows"]);
        let CliError::UnknownInstance { available, .. } = &err else {
            panic!("expected unknown instance");
        };
        assert_eq!(available, "movies, shows");
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }
}
