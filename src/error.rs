//! Error taxonomy for the index engine.
//!
//! `StorageError` covers the persistence layer; `SyncError` covers the
//! synchronization engine and wraps storage failures. NotFound and DuplicateKey
//! conditions indicate orchestration or caller bugs and are never retried.

use crate::types::FileId;
use std::path::PathBuf;
use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("row serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("value is not a valid row: {0}")]
    InvalidRow(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single metadata validation failure, reported with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: PathBuf,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: field '{}': {}",
            self.path.display(),
            self.field,
            self.message
        )
    }
}

/// Synchronization engine errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("file not found: {0}")]
    FileNotFound(FileId),

    #[error("duplicate file id: {0}")]
    DuplicateId(FileId),

    #[error("duplicate file path: {0}")]
    DuplicatePath(PathBuf),

    #[error("file tag edge not tracked: {file_id} -> {tag}")]
    FileTagNotTracked { file_id: FileId, tag: String },

    #[error("link edge not tracked: {from} -> {to}")]
    LinkNotTracked { from: FileId, to: String },

    #[error("broken link edge not tracked: {from} -> {to_path}")]
    BrokenLinkNotTracked { from: FileId, to_path: String },

    #[error("external link edge not tracked: {from} -> {url}")]
    ExternalLinkNotTracked { from: FileId, url: String },

    #[error("metadata validation failed with {} issue(s)", .0.len())]
    Validation(Vec<ValidationIssue>),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Validation issues carried by this error, if any.
    pub fn validation_issues(&self) -> &[ValidationIssue] {
        match self {
            SyncError::Validation(issues) => issues,
            _ => &[],
        }
    }
}
