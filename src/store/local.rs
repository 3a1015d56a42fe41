//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml       # Application configuration
//! ├── index.json        # The month index
//! └── checkpoint.json   # Scan progress (present only mid-build)
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Checkpoint, MonthIndex};
use crate::store::IndexStore;

const INDEX_KEY: &str = "index.json";
const CHECKPOINT_KEY: &str = "checkpoint.json";

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl IndexStore for LocalStore {
    async fn load(&self) -> Result<MonthIndex> {
        match self.read_json::<MonthIndex>(INDEX_KEY).await {
            Ok(Some(index)) => Ok(index),
            Ok(None) => Ok(MonthIndex::default()),
            // Corrupt index: rebuild from scratch instead of aborting
            Err(AppError::Json(e)) => {
                log::warn!("Persisted index failed to parse ({e}); treating as empty");
                Ok(MonthIndex::default())
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, index: &MonthIndex) -> Result<()> {
        self.write_json(INDEX_KEY, index).await
    }

    async fn load_checkpoint(&self) -> Result<Option<Checkpoint>> {
        match self.read_json::<Checkpoint>(CHECKPOINT_KEY).await {
            Ok(checkpoint) => Ok(checkpoint),
            Err(AppError::Json(e)) => {
                log::warn!("Checkpoint failed to parse ({e}); ignoring it");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.write_json(CHECKPOINT_KEY, checkpoint).await
    }

    async fn delete_checkpoint(&self) -> Result<()> {
        match tokio::fs::remove_file(self.path(CHECKPOINT_KEY)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}
