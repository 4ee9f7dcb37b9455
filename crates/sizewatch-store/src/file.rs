//! JSON file change store

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::error::{StoreError, StoreResult};
use crate::store::ChangeStore;

/// Default cache file, relative to the working directory
pub const DEFAULT_CACHE_FILE: &str = ".cache";

/// Change store persisted as a JSON array of strings in a single file
#[derive(Debug, Clone)]
pub struct FileChangeStore {
    path: PathBuf,
}

impl Default for FileChangeStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_FILE)
    }
}

impl FileChangeStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ChangeStore for FileChangeStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> StoreResult<Option<Vec<String>>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache file does not exist yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let entries: Vec<String> =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                location: self.location(),
                reason: e.to_string(),
            })?;

        debug!(entries = entries.len(), "Loaded cache file");
        Ok(Some(entries))
    }

    #[instrument(skip(self, fingerprints), fields(path = %self.path.display(), entries = fingerprints.len()))]
    async fn save(&self, fingerprints: &[String]) -> StoreResult<()> {
        let raw = serde_json::to_string(fingerprints)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Staged write: the target is only ever replaced by a complete file.
        let staging = self.staging_path();
        tokio::fs::write(&staging, raw).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        debug!("Rewrote cache file");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
