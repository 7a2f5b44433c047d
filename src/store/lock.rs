// src/store/lock.rs
//
// Two layers of mutual exclusion for per-service documents: an async mutex
// per identifier inside the process, and an advisory file lock across
// processes.

use super::StoreError;
use dashmap::DashMap;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(10);
const MAX_RETRY_DELAY: Duration = Duration::from_millis(500);

/// One async mutex per key, created on first use.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_create(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        // The map entry must not be held across the await.
        let lock = self.get_or_create(key);
        lock.lock_owned().await
    }
}

/// Exclusive advisory lock on a file, released when dropped.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Blocks the current thread until the lock is held or `timeout` elapses.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(e, path, "create lock directory"))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| StoreError::io(e, path, "open lock file"))?;

        let start = Instant::now();
        let mut retry_delay = INITIAL_RETRY_DELAY;

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    })
                }
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if start.elapsed() >= timeout {
                        return Err(StoreError::LockTimeout {
                            path: path.to_path_buf(),
                        });
                    }

                    thread::sleep(retry_delay);
                    retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
                }
                Err(e) => return Err(StoreError::io(e, path, "acquire lock")),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(path = %self.path.display(), "failed to release lock: {}", e);
        }
    }
}
