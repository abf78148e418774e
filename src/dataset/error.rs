//! Dataset error types
//!
//! Defines all errors that can occur while adding, removing, or loading datasets.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the dataset store
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Id is empty, whitespace-only, or contains the qualifier separator
    #[error("Invalid dataset id: '{0}'")]
    InvalidId(String),

    /// A dataset with this id is already added
    #[error("Dataset already exists: {0}")]
    AlreadyExists(String),

    /// No dataset with this id
    #[error("Dataset not found: {0}")]
    NotFound(String),

    /// Dataset has no records
    #[error("Dataset {0} contains no records")]
    Empty(String),

    /// A record does not belong to the dataset's kind
    #[error("Record {index} in dataset {id} does not match kind {kind}")]
    KindMismatch {
        id: String,
        index: usize,
        kind: crate::dataset::Kind,
    },

    /// Record failed to deserialize or carries non-finite numbers
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// I/O error while loading dataset files
    #[error("Failed to read {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    /// Dataset file is not valid JSON for its kind
    #[error("Failed to parse {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Result type alias for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;
