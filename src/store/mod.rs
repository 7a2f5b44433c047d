// src/store/mod.rs
mod document;
mod lock;
mod results;
mod summary;

pub use document::{DocumentGuard, DocumentStore};
pub use lock::{FileLock, KeyedLocks};
pub use results::ResultStore;
pub use summary::{LastStatus, Summary, SummaryAggregator};

pub(crate) use document::write_atomic;
pub(crate) use results::append_line;

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to {operation} at {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Timed out waiting for lock {}", .path.display())]
    LockTimeout { path: PathBuf },

    #[error("Storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub(crate) fn io(source: std::io::Error, path: &Path, operation: &'static str) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(source: serde_json::Error, path: &Path) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Layout of the data directory shared with the site renderer and pruning
/// scripts.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn checks(&self) -> PathBuf {
        self.root.join("checks")
    }

    pub fn summary(&self) -> PathBuf {
        self.root.join("summary")
    }

    pub fn incidents(&self) -> PathBuf {
        self.root.join("incidents")
    }

    pub async fn ensure(&self) -> Result<(), StoreError> {
        for dir in [self.checks(), self.summary(), self.incidents()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StoreError::io(e, &dir, "create data directory"))?;
        }
        Ok(())
    }
}
