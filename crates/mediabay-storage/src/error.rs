use std::io;
use std::path::PathBuf;

use mediabay_core::AppError;
use thiserror::Error;

/// Workspace and file operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create workspace {}", path.display())]
    CreateWorkspaceFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read upload stream")]
    ReadFailed {
        #[source]
        source: io::Error,
    },

    #[error("Failed to delete {}", path.display())]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Upload stream is empty")]
    EmptyUpload,

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::EmptyUpload | StorageError::InvalidFileName(_) => {
                AppError::InvalidInput(message)
            }
            // The caller's stream broke; nothing on disk is at fault.
            StorageError::ReadFailed { source } => {
                AppError::InvalidInput(format!("{}: {}", message, source))
            }
            StorageError::CreateWorkspaceFailed { source, .. }
            | StorageError::WriteFailed { source, .. }
            | StorageError::DeleteFailed { source, .. } => AppError::storage(message, source),
        }
    }
}
