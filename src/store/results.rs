// src/store/results.rs
use super::StoreError;
use crate::probe::CheckResult;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Append-only `<id>.ndjson` logs, one line per check.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.ndjson", id))
    }

    /// Returns once the line has been written and synced to disk.
    pub async fn append(&self, result: &CheckResult) -> Result<(), StoreError> {
        let path = self.path_for(&result.id);

        let mut line = serde_json::to_vec(result).map_err(|e| StoreError::json(e, &path))?;
        line.push(b'\n');

        append_line(&path, &line).await
    }
}

/// Append one already-terminated line to `path`, creating the file if
/// needed, and sync it before returning.
pub(crate) async fn append_line(path: &Path, line: &[u8]) -> Result<(), StoreError> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| StoreError::io(e, path, "open log"))?;

    // A single write keeps the line contiguous under O_APPEND.
    file.write_all(line)
        .await
        .map_err(|e| StoreError::io(e, path, "append line"))?;
    file.flush()
        .await
        .map_err(|e| StoreError::io(e, path, "flush log"))?;
    file.sync_data()
        .await
        .map_err(|e| StoreError::io(e, path, "sync log"))?;

    Ok(())
}
