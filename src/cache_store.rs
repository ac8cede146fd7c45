use crate::models::CacheSnapshot;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, instrument};

pub const CACHE_FILE_NAME: &str = "webmentions.json";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupt cache file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize cache: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// `webmentions.json` under the cache directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    path: PathBuf,
}

impl CacheStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let dir = cache_dir.into();
        let path = dir.join(CACHE_FILE_NAME);
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot. `Ok(None)` when no cache file exists yet.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn read(&self) -> Result<Option<CacheSnapshot>, CacheError> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let snapshot =
            serde_json::from_str::<CacheSnapshot>(&data).map_err(|source| CacheError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        debug!("Loaded {} cached webmentions", snapshot.children.len());
        Ok(Some(snapshot))
    }

    /// Like `read`, but a missing or unreadable cache is an empty snapshot.
    pub async fn load_or_default(&self) -> CacheSnapshot {
        match self.read().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => CacheSnapshot::default(),
            Err(e) => {
                error!("Error reading webmention cache, starting empty: {}", e);
                CacheSnapshot::default()
            }
        }
    }

    /// Overwrites the cache file with the pretty-printed snapshot.
    #[instrument(skip(self, snapshot), fields(path = %self.path.display()))]
    pub async fn write(&self, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
        let body = serde_json::to_string_pretty(snapshot)?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::Io {
                path: self.dir.clone(),
                source,
            })?;
        fs::write(&self.path, body)
            .await
            .map_err(|source| CacheError::Io {
                path: self.path.clone(),
                source,
            })?;

        debug!("Wrote {} webmentions to cache", snapshot.children.len());
        Ok(())
    }
}
