//! Local-directory storage for uploaded binaries.
//!
//! Binaries are addressed by a relative storage reference such as
//! `images/2026/10/3f2c....png` and live under the media root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage reference: {0}")]
    InvalidRef(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a storage reference to a path under the root.
    ///
    /// Only plain relative components are accepted.
    pub fn path_of(&self, storage_ref: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(storage_ref);
        let plain = !storage_ref.is_empty()
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(StorageError::InvalidRef(storage_ref.to_string()));
        }
        Ok(self.root.join(rel))
    }

    /// Write `data` at `storage_ref`, creating parent directories.
    pub async fn save(&self, storage_ref: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path_of(storage_ref)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        tracing::debug!(storage_ref, bytes = data.len(), "Stored media file");
        Ok(())
    }

    /// Remove the binary at `storage_ref`. Returns `false` if it was already gone.
    pub async fn delete(&self, storage_ref: &str) -> Result<bool, StorageError> {
        let path = self.path_of(storage_ref)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(storage_ref, "Media file already missing");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
