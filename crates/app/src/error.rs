use feetrack_core::{NotFoundError, RegistryError, ValidationError};
use std::path::PathBuf;

use feetrack_import::{DialectError, MappingImportError, WorkbookError};
use feetrack_storage::PersistenceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Could not read statement {file_name}: {source}")]
    Ingest {
        file_name: String,
        #[source]
        source: DialectError,
    },
    #[error("Could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Name import failed: {0}")]
    Import(#[from] MappingImportError),
    #[error("No statement is loaded")]
    NoStatement,
    #[error("No saved edits for {0}")]
    NoSavedEdits(String),
}

impl From<RegistryError> for TrackerError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Validation(e) => TrackerError::Validation(e),
            RegistryError::NotFound(e) => TrackerError::NotFound(e),
        }
    }
}
