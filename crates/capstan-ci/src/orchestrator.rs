//! Top-level façade binding the project registry to the build pipeline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use capstan_state::BuildStore;

use crate::config::CapstanConfig;
use crate::error::{BuildError, Result};
use crate::pipeline::{BuildOutcome, BuildPipeline};
use crate::project::Project;
use crate::request::{BuildFlags, BuildRequest, StreamCallback};
use crate::runner::CommandRunner;
use crate::sync::RevisionSync;

/// Main entry point: an in-memory project registry keyed by slug plus
/// the build pipeline that serves `build()` calls.
pub struct Capstan {
    store: Arc<dyn BuildStore>,
    pipeline: BuildPipeline,
    projects: Mutex<HashMap<String, Arc<Project>>>,
}

impl Capstan {
    pub fn new(store: Arc<dyn BuildStore>, config: CapstanConfig) -> Self {
        let runner = CommandRunner::new(Duration::from_secs(config.command_timeout_secs));
        let sync = RevisionSync::new(config.base_build_dir, runner.clone())
            .with_git_path(config.git_path)
            .with_commands(config.git_commands);
        let pipeline = BuildPipeline::new(store.clone(), sync, runner);

        Capstan {
            store,
            pipeline,
            projects: Mutex::new(HashMap::new()),
        }
    }

    /// Register a project, eagerly persisting its record. A project with
    /// the same slug replaces the previous registration.
    pub async fn add_project(&self, project: Project) -> Result<Arc<Project>> {
        self.store.update_project(project.record()).await?;

        let project = Arc::new(project);
        let mut projects = self.projects.lock().unwrap();
        projects.insert(project.slug().to_string(), project.clone());
        info!(project = %project.slug(), "project registered");
        Ok(project)
    }

    pub fn has_project(&self, slug: &str) -> bool {
        self.projects.lock().unwrap().contains_key(slug)
    }

    pub fn get_project(&self, slug: &str) -> Option<Arc<Project>> {
        self.projects.lock().unwrap().get(slug).cloned()
    }

    /// All registered projects, in no particular order.
    pub fn projects(&self) -> Vec<Arc<Project>> {
        self.projects.lock().unwrap().values().cloned().collect()
    }

    /// Build a project at a revision (`None` for the tracked branch tip).
    ///
    /// The outcome is also observable through the storage collaborator;
    /// live progress reaches the optional callback.
    pub async fn build(
        &self,
        slug: &str,
        revision: Option<&str>,
        flags: BuildFlags,
        stream: Option<Arc<StreamCallback>>,
    ) -> Result<BuildOutcome> {
        let project = self
            .get_project(slug)
            .ok_or_else(|| BuildError::UnknownProject(slug.to_string()))?;

        info!(project = %slug, revision = revision.unwrap_or("HEAD"), "build requested");
        let mut request =
            BuildRequest::new(project, revision.map(str::to_string), flags, stream);
        self.pipeline.run(&mut request).await
    }

    /// The pipeline's synchronizer (exposes the working-directory layout).
    pub fn synchronizer(&self) -> &RevisionSync {
        self.pipeline.synchronizer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_state::fakes::MemoryBuildStore;

    fn capstan() -> Capstan {
        let store = Arc::new(MemoryBuildStore::new());
        Capstan::new(store, CapstanConfig::new("/tmp/capstan-tests"))
    }

    #[tokio::test]
    async fn test_registry_round_trip() {
        let capstan = capstan();
        assert!(!capstan.has_project("demo"));

        capstan
            .add_project(Project::new("demo", "repo", "main", "true"))
            .await
            .unwrap();

        assert!(capstan.has_project("demo"));
        let project = capstan.get_project("demo").unwrap();
        assert_eq!(project.repository(), "repo");
        assert_eq!(capstan.projects().len(), 1);
    }

    #[tokio::test]
    async fn test_add_project_persists_record() {
        let store = Arc::new(MemoryBuildStore::new());
        let capstan = Capstan::new(store.clone(), CapstanConfig::new("/tmp/capstan-tests"));

        capstan
            .add_project(Project::new("demo", "repo", "main", "true"))
            .await
            .unwrap();

        let record = store.get_project("demo").await.unwrap().unwrap();
        assert_eq!(record.branch, "main");
    }

    #[tokio::test]
    async fn test_build_unknown_project_fails() {
        let capstan = capstan();
        let err = capstan
            .build("missing", None, BuildFlags::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownProject(_)));
    }

    #[tokio::test]
    async fn test_same_slug_replaces_registration() {
        let capstan = capstan();
        capstan
            .add_project(Project::new("demo", "repo-a", "main", "true"))
            .await
            .unwrap();
        capstan
            .add_project(Project::new("demo", "repo-b", "main", "true"))
            .await
            .unwrap();

        assert_eq!(capstan.projects().len(), 1);
        assert_eq!(capstan.get_project("demo").unwrap().repository(), "repo-b");
    }
}
