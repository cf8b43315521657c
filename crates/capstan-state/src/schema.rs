//! Schema definitions for Capstan storage records
//!
//! Records:
//! - projects: registered projects keyed by slug
//! - commits: build results keyed by (slug, sha)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Build status of a commit record.
///
/// Transitions: `Pending` → `Success` | `Failed` (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// Build requested, command not yet classified.
    Pending,
    /// Build command exited successfully.
    Success,
    /// Build command failed or timed out.
    Failed,
}

impl BuildStatus {
    /// Whether the status is terminal (anything other than `Pending`).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BuildStatus::Pending)
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BuildStatus::Pending => "pending",
            BuildStatus::Success => "success",
            BuildStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Project record stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Stable identifier, unique within the registry
    pub slug: String,
    /// Clone URL or local path of the repository
    pub repository: String,
    /// Tracked branch
    pub branch: String,
    /// Build command (multi-line shell script)
    pub command: String,
}

impl ProjectRecord {
    /// Create a new project record
    pub fn new(slug: &str, repository: &str, branch: &str, command: &str) -> Self {
        ProjectRecord {
            slug: slug.to_string(),
            repository: repository.to_string(),
            branch: branch.to_string(),
            command: command.to_string(),
        }
    }
}

/// Commit record - one build result for a (project, revision) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Slug of the project this commit belongs to
    pub slug: String,
    /// Full revision hash
    pub sha: String,
    /// Commit author
    pub author: String,
    /// Commit timestamp
    pub committed_at: DateTime<Utc>,
    /// Commit subject line
    pub message: String,
    /// Build status
    pub status: BuildStatus,
    /// Captured build output
    pub output: String,
    /// When the build reached a terminal status (None while pending)
    pub built_at: Option<DateTime<Utc>>,
}

impl CommitRecord {
    /// Create a new commit record in `Pending` state
    pub fn new(
        slug: &str,
        sha: &str,
        author: &str,
        committed_at: DateTime<Utc>,
        message: &str,
    ) -> Self {
        CommitRecord {
            slug: slug.to_string(),
            sha: sha.to_string(),
            author: author.to_string(),
            committed_at,
            message: message.to_string(),
            status: BuildStatus::Pending,
            output: String::new(),
            built_at: None,
        }
    }

    /// Mark the build as succeeded with its captured output
    pub fn succeed(mut self, output: String) -> Self {
        self.status = BuildStatus::Success;
        self.output = output;
        self.built_at = Some(Utc::now());
        self
    }

    /// Mark the build as failed with its captured output
    pub fn fail(mut self, output: String) -> Self {
        self.status = BuildStatus::Failed;
        self.output = output;
        self.built_at = Some(Utc::now());
        self
    }

    /// Short form of the revision hash (first 7 characters)
    pub fn short_sha(&self) -> &str {
        &self.sha[..7.min(self.sha.len())]
    }
}
