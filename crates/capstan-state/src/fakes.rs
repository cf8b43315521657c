//! In-memory fake for the storage trait (testing only)
//!
//! Provides `MemoryBuildStore`, which satisfies the `BuildStore` contract
//! without any external dependencies.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::schema::{CommitRecord, ProjectRecord};
use crate::storage_traits::{BuildStore, StorageResult};

/// In-memory build store backed by mutex-guarded maps.
#[derive(Debug, Default)]
pub struct MemoryBuildStore {
    projects: Mutex<HashMap<String, ProjectRecord>>,
    commits: Mutex<HashMap<(String, String), CommitRecord>>,
    building: Mutex<HashSet<String>>,
}

impl MemoryBuildStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commit records held (test convenience).
    pub fn commit_count(&self) -> usize {
        self.commits.lock().unwrap().len()
    }
}

#[async_trait]
impl BuildStore for MemoryBuildStore {
    async fn get_project(&self, slug: &str) -> StorageResult<Option<ProjectRecord>> {
        let projects = self.projects.lock().unwrap();
        Ok(projects.get(slug).cloned())
    }

    async fn update_project(&self, project: &ProjectRecord) -> StorageResult<()> {
        let mut projects = self.projects.lock().unwrap();
        projects.insert(project.slug.clone(), project.clone());
        Ok(())
    }

    async fn get_commit(&self, slug: &str, sha: &str) -> StorageResult<Option<CommitRecord>> {
        let commits = self.commits.lock().unwrap();
        Ok(commits.get(&(slug.to_string(), sha.to_string())).cloned())
    }

    async fn init_commit(
        &self,
        slug: &str,
        sha: &str,
        author: &str,
        committed_at: DateTime<Utc>,
        message: &str,
    ) -> StorageResult<CommitRecord> {
        let commit = CommitRecord::new(slug, sha, author, committed_at, message);
        let mut commits = self.commits.lock().unwrap();
        commits.insert((slug.to_string(), sha.to_string()), commit.clone());
        Ok(commit)
    }

    async fn update_commit(&self, commit: &CommitRecord) -> StorageResult<()> {
        let mut commits = self.commits.lock().unwrap();
        commits.insert((commit.slug.clone(), commit.sha.clone()), commit.clone());
        Ok(())
    }

    async fn try_begin_build(&self, slug: &str) -> StorageResult<bool> {
        let mut building = self.building.lock().unwrap();
        Ok(building.insert(slug.to_string()))
    }

    async fn end_build(&self, slug: &str) -> StorageResult<()> {
        let mut building = self.building.lock().unwrap();
        building.remove(slug);
        Ok(())
    }
}
