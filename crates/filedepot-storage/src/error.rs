//! Storage operation errors.

use std::path::PathBuf;

use filedepot_core::{BucketError, ConfigError};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid bucket: {0}")]
    InvalidBucket(#[from] BucketError),

    #[error("No stored file is bound: record {0:?} has not been persisted")]
    NoFileBound(String),

    #[error("Failed to create directory {path}: {source}")]
    DirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    #[error("Failed to write file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache flush failed at {path}: {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
