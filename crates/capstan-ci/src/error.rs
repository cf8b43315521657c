//! Error types for the build engine.
//!
//! Two kinds are distinguished: `SpawnError` means the external process
//! could not be launched at all (an infrastructure fault), while
//! `BuildError` covers everything that aborts a build attempt before the
//! build command runs. A failing build command is neither - it is a
//! `Failed` commit record, not an error.

use thiserror::Error;

/// The external process could not be launched at all.
#[derive(Error, Debug)]
#[error("unable to launch \"{command}\": {source}")]
pub struct SpawnError {
    /// The command line that failed to start.
    pub command: String,
    #[source]
    pub source: std::io::Error,
}

/// Errors that abort a build attempt.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("project \"{0}\" does not exist")]
    UnknownProject(String),

    #[error("unable to prepare build directory for project \"{project}\": {source}")]
    Workspace {
        project: String,
        source: std::io::Error,
    },

    #[error("unable to clone repository for project \"{project}\"")]
    Clone { project: String },

    #[error("unable to fetch repository for project \"{project}\"")]
    Fetch { project: String },

    #[error("unable to checkout branch \"{branch}\" for project \"{project}\"")]
    Checkout { project: String, branch: String },

    #[error("unable to update submodules for project \"{project}\"")]
    Submodules { project: String },

    #[error("unable to resolve HEAD of branch \"{branch}\" for project \"{project}\"")]
    Head { project: String, branch: String },

    #[error("revision \"{revision}\" for project \"{project}\" does not exist")]
    Revision { project: String, revision: String },

    #[error("unable to read commit metadata for project \"{project}\"")]
    Metadata { project: String },

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Storage(#[from] capstan_state::StorageError),
}

/// Result type for build engine operations
pub type Result<T> = std::result::Result<T, BuildError>;
