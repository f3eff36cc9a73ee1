use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use feetrack_core::ValidationError;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid registry in {}: {source}", .path.display())]
    Validation {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
    #[error("Invalid data in {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

impl PersistenceError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read a JSON document. `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PersistenceError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| PersistenceError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Write a JSON document in full. The new content goes to a sibling temp file
/// first and is renamed over the target, so readers never see half a file.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
    }
    let json = serde_json::to_vec_pretty(value).map_err(|source| PersistenceError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json).map_err(|e| PersistenceError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| PersistenceError::io(path, e))?;
    tracing::debug!(path = %path.display(), "saved");
    Ok(())
}
