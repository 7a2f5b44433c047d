// src/store/document.rs
use super::lock::{FileLock, KeyedLocks};
use super::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::OwnedMutexGuard;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// A directory of `<id>.json` documents, each updated under an exclusive lock.
#[derive(Clone)]
pub struct DocumentStore {
    dir: PathBuf,
    locks: KeyedLocks,
    lock_timeout: Duration,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: KeyedLocks::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn lock_path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", id))
    }

    pub async fn load<T>(&self, id: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let path = self.path_for(id);
        tokio::task::spawn_blocking(move || read_json(&path)).await?
    }

    /// Hold the document for `id` exclusively, within this process and across
    /// processes sharing the directory, until the guard is dropped.
    pub async fn lock(&self, id: &str) -> Result<DocumentGuard, StoreError> {
        let local = self.locks.acquire(id).await;

        let lock_path = self.lock_path_for(id);
        let timeout = self.lock_timeout;
        let file = tokio::task::spawn_blocking(move || FileLock::acquire(&lock_path, timeout))
            .await??;

        Ok(DocumentGuard {
            id: id.to_string(),
            _file: file,
            _local: local,
        })
    }

    /// Read-modify-write of one document. A missing document starts from
    /// `T::default()`. Updates for the same id never interleave, within this
    /// process or across processes sharing the directory.
    pub async fn update<T, R, F>(&self, id: &str, apply: F) -> Result<R, StoreError>
    where
        T: Default + Serialize + DeserializeOwned + Send + 'static,
        R: Send + 'static,
        F: FnOnce(&mut T) -> R + Send + 'static,
    {
        let guard = self.lock(id).await?;
        self.update_locked(&guard, apply).await
    }

    /// Same as [`update`](Self::update), for a caller already holding the lock.
    pub async fn update_locked<T, R, F>(
        &self,
        guard: &DocumentGuard,
        apply: F,
    ) -> Result<R, StoreError>
    where
        T: Default + Serialize + DeserializeOwned + Send + 'static,
        R: Send + 'static,
        F: FnOnce(&mut T) -> R + Send + 'static,
    {
        let path = self.path_for(&guard.id);

        tokio::task::spawn_blocking(move || -> Result<R, StoreError> {
            let mut document: T = read_json(&path)?.unwrap_or_default();
            let output = apply(&mut document);
            write_json_atomic(&path, &document)?;
            Ok(output)
        })
        .await?
    }
}

/// Exclusive hold on one document, released on drop.
pub struct DocumentGuard {
    id: String,
    // Declared before the local mutex so the file lock is released first.
    _file: FileLock,
    _local: OwnedMutexGuard<()>,
}

impl DocumentGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(e, path, "read document")),
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| StoreError::json(e, path))
}

/// Write through a temp file in the same directory and rename over the
/// target, so readers see either the old or the new document.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(value).map_err(|e| StoreError::json(e, path))?;
    write_atomic(path, content.as_bytes())
}

pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp_file =
        NamedTempFile::new_in(parent).map_err(|e| StoreError::io(e, path, "create temp file"))?;
    temp_file
        .write_all(content)
        .map_err(|e| StoreError::io(e, path, "write temp file"))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| StoreError::io(e, path, "sync temp file"))?;
    temp_file
        .persist(path)
        .map_err(|e| StoreError::io(e.error, path, "persist temp file"))?;

    #[cfg(unix)]
    {
        File::open(parent)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| StoreError::io(e, path, "sync parent directory"))?;
    }

    Ok(())
}
