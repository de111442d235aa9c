//! Local JSON file cache backend.
//!
//! The whole cache lives in one UTF-8 JSON document that is fully replaced on
//! every save via write-then-rename.
//!
//! Two runs must not target the same file concurrently: there is no locking,
//! the atomic rename only guarantees readers never see a partial file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::storage::{CacheRepository, MediaCache};
use crate::utils::fs::write_atomic;

/// Cache persisted as a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonCacheFile {
    path: PathBuf,
}

impl JsonCacheFile {
    /// Create a backend for the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read and decode the cache, distinguishing missing from corrupt.
    async fn read_cache(&self) -> Result<Option<MediaCache>> {
        match self.read_bytes().await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CacheRepository for JsonCacheFile {
    async fn load(&self) -> MediaCache {
        match self.read_cache().await {
            Ok(Some(cache)) => {
                log::info!(
                    "Loaded {} cached records from {}",
                    cache.len(),
                    self.path.display()
                );
                cache
            }
            Ok(None) => {
                log::info!("No cache at {}, starting empty", self.path.display());
                MediaCache::new()
            }
            Err(e) => {
                log::error!(
                    "Cache at {} is unreadable, starting empty: {}",
                    self.path.display(),
                    e
                );
                MediaCache::new()
            }
        }
    }

    async fn save(&self, cache: &MediaCache) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(cache)?;
        write_atomic(&self.path, &bytes).await?;
        log::info!(
            "Saved {} cached records to {}",
            cache.len(),
            self.path.display()
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
