//! Storage trait definition for Capstan
//!
//! `BuildStore` is the single storage abstraction the build engine
//! consumes: project persistence, commit records, and the per-project
//! build slot that serializes concurrent build attempts.
//!
//! The trait is async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::schema::{CommitRecord, ProjectRecord};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Persistent store for projects and their build results.
///
/// Guarantees:
/// - `init_commit` persists a fresh `Pending` record for the pair,
///   replacing any prior record (a forced rebuild starts from `Pending`).
/// - `try_begin_build`/`end_build` implement an atomic per-slug build
///   slot: at most one caller holds the slot at a time, and the
///   test-and-set is indivisible with respect to concurrent callers.
/// - Commit records are keyed by (slug, sha); projects by slug.
#[async_trait]
pub trait BuildStore: Send + Sync {
    /// Retrieve a project by slug, or `None` if unknown.
    async fn get_project(&self, slug: &str) -> StorageResult<Option<ProjectRecord>>;

    /// Create or replace a project record.
    async fn update_project(&self, project: &ProjectRecord) -> StorageResult<()>;

    /// Retrieve the commit record for a (project, revision) pair, if any.
    async fn get_commit(&self, slug: &str, sha: &str) -> StorageResult<Option<CommitRecord>>;

    /// Create a fresh `Pending` commit record for the pair and persist it,
    /// replacing any prior record.
    async fn init_commit(
        &self,
        slug: &str,
        sha: &str,
        author: &str,
        committed_at: DateTime<Utc>,
        message: &str,
    ) -> StorageResult<CommitRecord>;

    /// Persist an updated commit record (status/output transitions).
    async fn update_commit(&self, commit: &CommitRecord) -> StorageResult<()>;

    /// Atomically claim the build slot for a project. Returns `false`
    /// without side effects if the slot is already held.
    async fn try_begin_build(&self, slug: &str) -> StorageResult<bool>;

    /// Release the build slot for a project. No-op if not held.
    async fn end_build(&self, slug: &str) -> StorageResult<()>;
}
