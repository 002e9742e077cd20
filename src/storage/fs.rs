use crate::storage::{resolve_within, Storage};
use crate::{ConfigError, MirrorError, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes the mirror into a directory that must not exist beforehand
///
/// The directory itself is only created by the first save, so a crawl
/// that persists nothing leaves no trace on disk.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn persist_error(path: &str, source: io::Error) -> MirrorError {
        MirrorError::Persist {
            path: path.to_string(),
            source,
        }
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn prepare(&self) -> Result<()> {
        if tokio::fs::metadata(&self.root).await.is_ok() {
            return Err(ConfigError::DirectoryExists(self.root.display().to_string()).into());
        }
        Ok(())
    }

    async fn save(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let target = resolve_within(&self.root, path).ok_or_else(|| {
            Self::persist_error(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "path escapes the output directory"),
            )
        })?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::persist_error(path, e))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| Self::persist_error(path, e))?;

        debug!("Saved {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        if tokio::fs::metadata(&self.root).await.is_err() {
            return Ok(());
        }
        info!("Removing {}", self.root.display());
        tokio::fs::remove_dir_all(&self.root)
            .await
            .map_err(|e| Self::persist_error(&self.root.display().to_string(), e))
    }
}
