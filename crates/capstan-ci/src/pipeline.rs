//! Build pipeline orchestration: guard, synchronize, execute, notify.
//!
//! The pipeline is three fixed phase groups run in order. Pre-build may
//! halt the run (already building, already built) or abort it with a
//! `BuildError`; the build group classifies the command outcome into the
//! commit record and never halts; post-build fans the finished record out
//! to the project's notification sinks.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use capstan_state::{BuildStore, CommitRecord};

use crate::error::{BuildError, Result};
use crate::project::Project;
use crate::request::{BuildRequest, StreamKind};
use crate::runner::CommandRunner;
use crate::sync::RevisionSync;

/// Name of the script file the build command is materialized into.
const BUILD_SCRIPT: &str = "capstan-build.sh";

/// What a completed pipeline run reports back.
///
/// Final state is always observable through storage as well; the outcome
/// exists so callers and tests can tell a build from a short-circuit
/// without polling.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// The build command ran; the commit carries the classification.
    Built {
        commit: CommitRecord,
        duration_ms: u64,
    },
    /// Another build of the project was in flight and `force` was absent.
    SkippedAlreadyBuilding,
    /// The resolved revision already has a terminal record and `force`
    /// was absent.
    SkippedAlreadyBuilt { sha: String },
}

/// The phase sequencer: owns the ordered phase list and the
/// short-circuit protocol.
pub struct BuildPipeline {
    store: Arc<dyn BuildStore>,
    sync: RevisionSync,
    runner: CommandRunner,
}

impl BuildPipeline {
    pub fn new(store: Arc<dyn BuildStore>, sync: RevisionSync, runner: CommandRunner) -> Self {
        BuildPipeline {
            store,
            sync,
            runner,
        }
    }

    pub fn synchronizer(&self) -> &RevisionSync {
        &self.sync
    }

    /// Run the phase groups for one request.
    ///
    /// The build slot is claimed before synchronization and released
    /// after notification, on error paths included. A forced build whose
    /// claim failed proceeds without owning the slot and never releases
    /// another build's claim.
    pub async fn run(&self, request: &mut BuildRequest) -> Result<BuildOutcome> {
        let slug = request.project.slug().to_string();
        let start = Instant::now();

        let acquired = self.store.try_begin_build(&slug).await?;
        if !acquired && !request.flags.force {
            info!(project = %slug, "build already in flight, skipping");
            return Ok(BuildOutcome::SkippedAlreadyBuilding);
        }

        let outcome = self.run_guarded(request, start).await;

        let released = if acquired {
            self.store.end_build(&slug).await
        } else {
            Ok(())
        };

        let outcome = outcome?;
        released?;
        Ok(outcome)
    }

    async fn run_guarded(&self, request: &mut BuildRequest, start: Instant) -> Result<BuildOutcome> {
        let project = request.project.clone();
        let slug = project.slug();

        // Pre-build: synchronize, then decide on the resolved hash.
        let resolved = self.sync.synchronize(request).await?;
        info!(project = %slug, sha = %resolved.sha, "working copy synchronized");

        if let Some(existing) = self.store.get_commit(slug, &resolved.sha).await? {
            if existing.status.is_terminal() && !request.flags.force {
                info!(project = %slug, sha = %resolved.sha, "revision already built, skipping");
                return Ok(BuildOutcome::SkippedAlreadyBuilt { sha: resolved.sha });
            }
        }

        let commit = self
            .store
            .init_commit(
                slug,
                &resolved.sha,
                &resolved.author,
                resolved.committed_at,
                &resolved.message,
            )
            .await?;
        request.commit = Some(commit.clone());

        // Build: materialize the script and classify the outcome.
        request.emit(StreamKind::Out, "BUILD START");
        let commit = self.execute(request, commit).await?;
        request.commit = Some(commit.clone());
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            project = %slug,
            sha = %commit.short_sha(),
            status = %commit.status,
            duration_ms,
            "build finished"
        );

        // Post-build: notification fan-out.
        if !request.flags.silent {
            self.notify(&project, &commit).await;
        }

        Ok(BuildOutcome::Built {
            commit,
            duration_ms,
        })
    }

    /// Write the build script into the working directory and run it.
    ///
    /// A non-zero exit or timeout is a `Failed` commit, not an error;
    /// only spawn failures and storage failures propagate.
    async fn execute(&self, request: &BuildRequest, commit: CommitRecord) -> Result<CommitRecord> {
        let project = &request.project;
        let dir = self.sync.build_dir(project);

        let script = normalize_newlines(project.command());
        tokio::fs::write(dir.join(BUILD_SCRIPT), script)
            .await
            .map_err(|source| BuildError::Workspace {
                project: project.slug().to_string(),
                source,
            })?;

        let command = vec!["sh".to_string(), BUILD_SCRIPT.to_string()];
        let output = self
            .runner
            .run(&command, &dir, request.stream.as_deref())
            .await?;

        let commit = if output.success {
            commit.succeed(output.stdout)
        } else {
            commit.fail(format!(
                "\x1b[31mBuild failed\x1b[0m\n\n\x1b[33mOutput\x1b[0m\n{}\n\n\x1b[33mError\x1b[0m\n{}",
                output.stdout, output.stderr
            ))
        };

        self.store.update_commit(&commit).await?;
        Ok(commit)
    }

    /// Deliver the finished commit to every sink, isolating failures.
    async fn notify(&self, project: &Project, commit: &CommitRecord) {
        for notifier in project.notifiers() {
            if let Err(error) = notifier.notify(commit).await {
                warn!(project = %project.slug(), %error, "notifier failed");
            }
        }
    }
}

/// Normalize line endings to `\n` before the script hits the shell.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
