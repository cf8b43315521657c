//! Error types for capstan-state

use thiserror::Error;

/// Errors that can occur at the storage boundary
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend connection or query error
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// Serialization error
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Project not found
    #[error("project not found: {slug}")]
    ProjectNotFound { slug: String },

    /// Commit not found
    #[error("commit not found: {slug}@{sha}")]
    CommitNotFound { slug: String, sha: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
