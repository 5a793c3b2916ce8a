//! JSON progress sidecars so an interrupted task can resume where it stopped.
//!
//! The file lives next to the destination (`<dest>.dlsched`) unless a
//! progress directory is configured. Writes go through a temp file and a
//! rename so a crash mid-save never leaves a truncated record.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use crate::task::{Gid, TaskError};

/// Suffix appended to the destination file name.
pub const PROGRESS_SUFFIX: &str = ".dlsched";

/// Persisted state of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub gid: Gid,
    pub bytes_done: u64,
    pub total_bytes: u64,
    #[serde(default)]
    pub uris: Vec<String>,
}

/// Progress file path for `destination`, optionally relocated into `dir`.
pub fn progress_path_for(destination: &Path, dir: Option<&Path>) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(PROGRESS_SUFFIX);
    match dir {
        Some(dir) => dir.join(name),
        None => destination.with_file_name(name),
    }
}

fn io_err(path: &Path, source: io::Error) -> TaskError {
    TaskError::Progress {
        path: path.to_path_buf(),
        source,
    }
}

/// Save `record` to `path` (creates parent dir if needed).
pub fn save(path: &Path, record: &ProgressRecord) -> Result<(), TaskError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(path, e))?;
    }
    let json = serde_json::to_vec_pretty(record).map_err(|e| TaskError::Codec {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Load a record. Missing file is `Ok(None)`.
pub fn load(path: &Path) -> Result<Option<ProgressRecord>, TaskError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e)),
    };
    let record = serde_json::from_slice(&bytes).map_err(|e| TaskError::Codec {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Some(record))
}

/// Remove the record. Missing file is not an error.
pub fn remove(path: &Path) -> Result<(), TaskError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(path, e)),
    }
}
