use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("marker directory missing or not writable: {0}")]
    MarkerDir(String),
    #[error("marker format: {0}")]
    Format(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Durable record of the most recently persisted run. Its sole purpose is
/// to keep a reloaded session from saving the same run twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRunMarker {
    pub run_id: u64,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct MarkerStore {
    path: PathBuf,
}

impl MarkerStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Option<SavedRunMarker>, OutboxError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(OutboxError::Io(err)),
        };
        let marker =
            ron::from_str(&content).map_err(|err| OutboxError::Format(err.to_string()))?;
        Ok(Some(marker))
    }

    /// Atomically replace the marker: temp file in the same directory, then
    /// rename over the target.
    pub fn record(&self, marker: SavedRunMarker) -> Result<(), OutboxError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|err| OutboxError::MarkerDir(err.to_string()))?;

        let content =
            ron::ser::to_string(&marker).map_err(|err| OutboxError::Format(err.to_string()))?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        tmp.persist(&self.path)
            .map_err(|err| OutboxError::Io(err.error))?;
        Ok(())
    }
}
