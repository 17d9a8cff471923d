//! Configuration for the Nebularr CLI.
//!
//! TOML instance profiles, credential resolution (env + keyring +
//! plaintext), desired-state files, and translation to
//! `nebularr_core::ManagedObject` and `ReconcileSettings`.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use nebularr_core::{
    BackendKind, Backoff, ConnectionIR, Credential, IR, ManagedObject, ProwlarrRef,
    ReconcileSettings, RetryPolicy, TlsVerification,
};

const KEYRING_SERVICE: &str = "nebularr";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for instance '{instance}'")]
    NoCredentials { instance: String },

    #[error("unknown instance '{name}'")]
    UnknownInstance { name: String },

    #[error("cannot load desired state {}: {message}", .path.display())]
    Desired { path: PathBuf, message: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Directory for per-instance status files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_dir: Option<PathBuf>,

    /// Named backend instances.
    #[serde(default)]
    pub instances: BTreeMap<String, Instance>,

    /// Directory of the loaded config file; relative paths resolve here.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Defaults {
    pub output: String,
    pub color: String,
    pub insecure: bool,
    /// Per-request timeout (seconds).
    pub timeout: u64,
    /// Resync interval of a healthy instance (seconds).
    pub period: u64,
    /// Upper bound on one reconcile (seconds).
    pub deadline: u64,
    /// Concurrent reconciles.
    pub workers: usize,
    pub backoff_base: u64,
    pub backoff_max: u64,
    /// Attempts for read-only calls, including the first.
    pub read_attempts: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: "table".into(),
            color: "auto".into(),
            insecure: false,
            timeout: 30,
            period: 300,
            deadline: 300,
            workers: 4,
            backoff_base: 5,
            backoff_max: 300,
            read_attempts: 3,
        }
    }
}

/// A named backend instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Instance {
    pub backend: BackendKind,

    /// Service base URL (e.g., "http://radarr:7878"), or a `file://` URL
    /// for the file backend.
    pub url: String,

    /// Desired-state file: TOML, YAML (`.yaml`/`.yml`) or JSON (`.json`).
    pub desired: Option<PathBuf>,

    /// API key (plaintext, prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    #[serde(default)]
    pub suspend: bool,

    /// Bump to force a reconcile even without drift.
    #[serde(default = "default_generation")]
    pub generation: i64,

    /// Name of the Prowlarr instance that should index this one.
    pub prowlarr: Option<String>,
}

fn default_generation() -> i64 {
    1
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "nebularr", "nebularr")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "nebularr", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Platform data directory.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "nebularr"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from defaults, file and `NEBULARR_` environment.
///
/// Nested keys use a double underscore: `NEBULARR_DEFAULTS__PERIOD=60`.
/// A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("NEBULARR_").split("__"));

    let mut config: Config = figment.extract()?;
    config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(config)
}

/// Parse a desired-state file into IR; the extension picks the format.
pub fn load_desired(path: &Path) -> Result<IR, ConfigError> {
    let fail = |e: &dyn Display| ConfigError::Desired {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let raw = std::fs::read_to_string(path).map_err(|e| fail(&e))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("yaml" | "yml") => serde_yaml::from_str(&raw).map_err(|e| fail(&e)),
        Some("json") => serde_json::from_str(&raw).map_err(|e| fail(&e)),
        _ => toml::from_str(&raw).map_err(|e| fail(&e)),
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve an API key: `api_key_env`, then the system keyring entry
/// `nebularr` / `<instance>/api-key`, then plaintext.
pub fn resolve_api_key(instance: &Instance, name: &str) -> Result<SecretString, ConfigError> {
    // 1. Instance's api_key_env → env var lookup
    if let Some(ref env_name) = instance.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{name}/api-key")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = instance.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        instance: name.into(),
    })
}

// ── Translation to core types ───────────────────────────────────────

fn connection(instance: &Instance, name: &str, defaults: &Defaults) -> Result<ConnectionIR, ConfigError> {
    let url: Url = instance.url.parse().map_err(|_| ConfigError::Validation {
        field: format!("instances.{name}.url"),
        reason: format!("invalid URL: {}", instance.url),
    })?;

    let credential = if instance.backend == BackendKind::File {
        if url.scheme() != "file" {
            return Err(ConfigError::Validation {
                field: format!("instances.{name}.url"),
                reason: "file instances need a file:// URL".into(),
            });
        }
        Credential::None
    } else {
        Credential::ApiKey(resolve_api_key(instance, name)?)
    };

    let tls = if instance.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = instance.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(ConnectionIR {
        url,
        credential,
        timeout: Duration::from_secs(instance.timeout.unwrap_or(defaults.timeout)),
        tls,
    })
}

impl Config {
    pub fn settings(&self) -> ReconcileSettings {
        let d = &self.defaults;
        ReconcileSettings {
            period: Duration::from_secs(d.period),
            deadline: Duration::from_secs(d.deadline),
            read_retry: RetryPolicy {
                max_attempts: d.read_attempts.max(1),
                ..RetryPolicy::default()
            },
            backoff: Backoff {
                base: Duration::from_secs(d.backoff_base),
                max: Duration::from_secs(d.backoff_max.max(d.backoff_base)),
            },
        }
    }

    pub fn status_dir(&self) -> PathBuf {
        self.status_dir
            .as_ref()
            .map_or_else(|| data_dir().join("status"), |dir| self.resolve(dir))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn instance(&self, name: &str) -> Result<&Instance, ConfigError> {
        self.instances
            .get(name)
            .ok_or_else(|| ConfigError::UnknownInstance { name: name.into() })
    }

    /// Build the managed object of one instance, resolving credentials and
    /// reading its desired-state file.
    pub fn object(&self, name: &str) -> Result<ManagedObject, ConfigError> {
        let instance = self.instance(name)?;
        let connection = connection(instance, name, &self.defaults)?;

        let desired = match &instance.desired {
            Some(path) => load_desired(&self.resolve(path))?,
            None => IR::default(),
        };

        let prowlarr = match &instance.prowlarr {
            Some(target_name) => {
                let target = self.instance(target_name)?;
                if target.backend != BackendKind::Prowlarr {
                    return Err(ConfigError::Validation {
                        field: format!("instances.{name}.prowlarr"),
                        reason: format!("'{target_name}' is a {} instance", target.backend),
                    });
                }
                Some(ProwlarrRef {
                    name: target_name.clone(),
                    connection: crate::connection(target, target_name, &self.defaults)?,
                })
            }
            None => None,
        };

        Ok(ManagedObject {
            name: name.to_owned(),
            generation: instance.generation,
            suspend: instance.suspend,
            backend: instance.backend,
            connection,
            desired,
            prowlarr,
        })
    }

    /// Objects for `names`, or for every instance when `names` is empty.
    pub fn objects(&self, names: &[String]) -> Result<Vec<ManagedObject>, ConfigError> {
        if names.is_empty() {
            self.instances.keys().map(|name| self.object(name)).collect()
        } else {
            names.iter().map(|name| self.object(name)).collect()
        }
    }
}
