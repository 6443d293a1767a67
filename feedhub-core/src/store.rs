use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::StoreError;

const CACHE_FILE: &str = "cache.json";

#[derive(Debug, Default)]
struct CacheState {
    // source url -> serialized feed document
    entries: HashMap<String, String>,
    closed: bool,
}

/// Last known good value per source.
///
/// Every `put` replaces the whole value for its key. With a backing
/// directory the full map is rewritten to `cache.json` through a temp file
/// before the in-memory map changes, so readers only ever observe values
/// that made it to disk.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<RwLock<CacheState>>,
    path: Option<PathBuf>,
}

impl CacheStore {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheState::default())),
            path: None,
        }
    }

    /// Opens the store in `dir`, discarding whatever a previous process cached there.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(CACHE_FILE);
        for stale in [path.clone(), tmp_path(&path)] {
            match tokio::fs::remove_file(&stale).await {
                Ok(()) => debug!(path = %stale.display(), "discarded previous cache file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(path = %path.display(), "cache store opened");

        Ok(Self {
            inner: Arc::new(RwLock::new(CacheState::default())),
            path: Some(path),
        })
    }

    pub async fn put(&self, key: &str, value: impl Into<String>) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        if state.closed {
            return Err(StoreError::Closed);
        }

        let previous = state.entries.insert(key.to_owned(), value.into());
        if let Some(path) = &self.path {
            if let Err(err) = persist(path, &state.entries).await {
                match previous {
                    Some(old) => state.entries.insert(key.to_owned(), old),
                    None => state.entries.remove(key),
                };
                return Err(err);
            }
        }
        Ok(())
    }

    /// Returns `NotFound` for absent keys and for empty values alike.
    pub async fn get(&self, key: &str) -> Result<String, StoreError> {
        let state = self.inner.read().await;
        if state.closed {
            return Err(StoreError::Closed);
        }
        match state.entries.get(key) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(StoreError::NotFound(key.to_owned())),
        }
    }

    pub async fn close(&self) {
        let mut state = self.inner.write().await;
        state.closed = true;
        debug!("cache store closed");
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

async fn persist(path: &Path, entries: &HashMap<String, String>) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(entries)?;
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
