//! Status persistence: one JSON document per instance.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use nebularr_core::{ObjectStatus, StatusStore, StoreError};

/// Statuses under `<dir>/<instance>.json`, replaced atomically.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    dir: PathBuf,
}

impl FileStatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl StatusStore for FileStatusStore {
    async fn load(&self, name: &str) -> Result<Option<ObjectStatus>, StoreError> {
        let path = self.path(name);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| StoreError::Format {
                name: name.to_owned(),
                message: e.to_string(),
            })
    }

    async fn save(&self, name: &str, status: &ObjectStatus) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let body = serde_json::to_vec_pretty(status).map_err(|e| StoreError::Format {
            name: name.to_owned(),
            message: e.to_string(),
        })?;
        let path = self.path(name);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&path, e))?;
        debug!(path = %path.display(), "status saved");
        Ok(())
    }
}
