// ── File adapter ──
//
// Renders the desired IR to a local file (`file:///etc/app/config.yaml`).
// The file is the whole backend, so it owns everything in it and is
// written in one step through `DirectApplier`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use super::{Adapter, BackendKind, DirectApplier, ServiceInfo};
use crate::capabilities::Capabilities;
use crate::changeset::{ApplyResult, ChangeSet};
use crate::connection::ConnectionIR;
use crate::context::Context;
use crate::diff::{self, Ownership};
use crate::error::{AdapterError, DiffError};
use crate::ir::IR;
use crate::ownership::ManagedResources;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

fn storage(path: &Path, err: impl std::fmt::Display) -> AdapterError {
    AdapterError::Storage {
        message: format!("{}: {err}", path.display()),
    }
}

fn target(conn: &ConnectionIR) -> Result<PathBuf, AdapterError> {
    if conn.url.scheme() != "file" {
        return Err(AdapterError::Protocol {
            message: format!("file backend needs a file:// URL, got {}", conn.url),
        });
    }
    conn.url.to_file_path().map_err(|()| AdapterError::Protocol {
        message: format!("not a local path: {}", conn.url),
    })
}

fn render(desired: &IR, format: Format) -> Result<String, String> {
    match format {
        Format::Yaml => serde_yaml::to_string(desired).map_err(|e| e.to_string()),
        Format::Json => serde_json::to_string_pretty(desired)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
    }
}

fn parse(raw: &str, format: Format) -> Result<IR, String> {
    if raw.trim().is_empty() {
        return Ok(IR::default());
    }
    match format {
        Format::Yaml => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
    }
}

async fn read_existing(path: &Path) -> Result<Option<String>, AdapterError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(storage(path, e)),
    }
}

#[async_trait]
impl Adapter for FileAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::File
    }

    /// The parent directory must exist; the file itself may not yet.
    async fn connect(&self, _ctx: &Context, conn: &ConnectionIR) -> Result<ServiceInfo, AdapterError> {
        let path = target(conn)?;
        let parent = path.parent().unwrap_or_else(|| Path::new("/"));
        match tokio::fs::metadata(parent).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(AdapterError::Unreachable {
                    url: conn.url.to_string(),
                    reason: format!("{} is not a directory", parent.display()),
                });
            }
            Err(e) => {
                return Err(AdapterError::Unreachable {
                    url: conn.url.to_string(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(ServiceInfo {
            version: env!("CARGO_PKG_VERSION").to_owned(),
            start_time: None,
        })
    }

    async fn discover(&self, _ctx: &Context, _conn: &ConnectionIR) -> Result<Capabilities, AdapterError> {
        Ok(Capabilities::unrestricted(Utc::now()))
    }

    async fn current_state(
        &self,
        _ctx: &Context,
        conn: &ConnectionIR,
        _owned: &ManagedResources,
    ) -> Result<IR, AdapterError> {
        let path = target(conn)?;
        match read_existing(&path).await? {
            Some(raw) => parse(&raw, Format::of(&path)).map_err(|e| storage(&path, e)),
            None => Ok(IR::default()),
        }
    }

    fn diff(
        &self,
        current: &IR,
        desired: &IR,
        caps: &Capabilities,
        _owned: &ManagedResources,
    ) -> Result<ChangeSet, DiffError> {
        diff::diff_with(current, desired, caps, Ownership::Everything)
    }

    async fn apply(
        &self,
        _ctx: &Context,
        _conn: &ConnectionIR,
        _changes: &ChangeSet,
        _owned: &ManagedResources,
    ) -> Result<ApplyResult, AdapterError> {
        Err(AdapterError::Unsupported {
            operation: "incremental apply on a file backend".into(),
        })
    }

    fn as_direct_applier(&self) -> Option<&dyn DirectApplier> {
        Some(self)
    }
}

#[async_trait]
impl DirectApplier for FileAdapter {
    /// Replace the file atomically: write a sibling temp file, then rename.
    /// An unchanged file is not rewritten.
    async fn apply_direct(
        &self,
        ctx: &Context,
        conn: &ConnectionIR,
        desired: &IR,
    ) -> Result<ApplyResult, AdapterError> {
        let path = target(conn)?;
        let rendered = render(desired, Format::of(&path)).map_err(|e| storage(&path, e))?;

        if ctx.is_done() {
            return Ok(ApplyResult {
                skipped: 1,
                interrupted: true,
                ..ApplyResult::default()
            });
        }
        if read_existing(&path).await?.as_deref() == Some(rendered.as_str()) {
            debug!(path = %path.display(), "file up to date");
            return Ok(ApplyResult {
                skipped: 1,
                ..ApplyResult::default()
            });
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".nebularr.tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, rendered.as_bytes())
            .await
            .map_err(|e| storage(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(storage(&path, e));
        }
        info!(path = %path.display(), "file written");
        Ok(ApplyResult {
            applied: 1,
            ..ApplyResult::default()
        })
    }
}
