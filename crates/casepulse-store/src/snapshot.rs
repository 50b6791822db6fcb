//! File-backed snapshot store.
//!
//! Each monitor key owns one file under the data directory holding the full
//! result set from its latest changed poll. Saves replace the file atomically
//! (temp file in the same directory, then rename), so readers see either the
//! previous snapshot or the new one, never a partial write.
//!
//! There is no locking beyond that: two concurrent polls of the same key can
//! both read the old snapshot and the last writer wins. Polls of different
//! keys touch different files and never interfere.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use casepulse_core::Snapshot;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::StoreError;

const SNAPSHOT_EXT: &str = ".json";

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open the store at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the snapshot stored under `file`, or `None` if it was never saved.
    pub fn load(&self, file: &str) -> Result<Option<Snapshot>, StoreError> {
        let path = self.path_for(file)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
                file: file.to_string(),
                source,
            })?;
        debug!(file, count = snapshot.len(), "loaded snapshot");
        Ok(Some(snapshot))
    }

    /// Replace the snapshot stored under `file` with `snapshot`.
    pub fn save(&self, file: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let path = self.path_for(file)?;
        let data = serde_json::to_vec_pretty(snapshot).map_err(|source| StoreError::Json {
            file: file.to_string(),
            source,
        })?;

        let io_err = |source: io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(&data).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|source| StoreError::Persist {
            file: file.to_string(),
            source,
        })?;

        info!(file, count = snapshot.len(), "saved snapshot");
        Ok(())
    }

    /// Names of all saved snapshot files, sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            if !entry.file_type().map_err(io_err)?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(SNAPSHOT_EXT) {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn path_for(&self, file: &str) -> Result<PathBuf, StoreError> {
        let valid = file.len() > SNAPSHOT_EXT.len()
            && file.ends_with(SNAPSHOT_EXT)
            && !file.starts_with('.')
            && !file.contains(['/', '\\']);
        if !valid {
            return Err(StoreError::InvalidFileName(file.to_string()));
        }
        Ok(self.dir.join(file))
    }
}
