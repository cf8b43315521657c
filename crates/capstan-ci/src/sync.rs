//! Git working-copy synchronization.
//!
//! `RevisionSync` brings a per-project build directory to the exact state
//! of a requested revision: clone if absent, fetch, force checkout,
//! submodule sync, explicit revision resolution, hard reset, metadata
//! read. Every step is an external git invocation through
//! `CommandRunner`; every failure maps to a phase-specific `BuildError`
//! naming the project.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{BuildError, Result};
use crate::project::Project;
use crate::request::{BuildRequest, StreamKind};
use crate::runner::{CommandRunner, ProcessOutput};

/// Format string substituted into the `show` template for metadata
/// extraction: hash, author name, ISO-8601 date, subject.
const SHOW_FORMAT: &str = "%H%n%an%n%ci%n%s";

/// The six overridable git command templates.
///
/// Each template is an argument vector (the git binary itself is
/// prepended at execution time). The placeholder tokens `{repo}`,
/// `{dir}`, `{branch}`, `{local_branch}`, `{revision}` and `{format}` are
/// substituted per argument before execution - commands are never built
/// as a single shell string.
#[derive(Debug, Clone)]
pub struct GitCommands {
    pub clone: Vec<String>,
    pub fetch: Vec<String>,
    pub submodules: Vec<String>,
    pub checkout: Vec<String>,
    pub reset: Vec<String>,
    pub show: Vec<String>,
}

impl Default for GitCommands {
    fn default() -> Self {
        GitCommands {
            clone: argv(&[
                "clone",
                "--progress",
                "--recursive",
                "{repo}",
                "{dir}",
                "--branch",
                "{local_branch}",
            ]),
            fetch: argv(&["fetch", "origin"]),
            submodules: argv(&["submodule", "update", "--init", "--recursive"]),
            checkout: argv(&["checkout", "-q", "-f", "{branch}"]),
            reset: argv(&["reset", "--hard", "{revision}"]),
            show: argv(&["show", "-s", "--pretty=format:{format}", "{revision}"]),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Metadata of the revision a working copy was synchronized to.
#[derive(Debug, Clone)]
pub struct ResolvedCommit {
    /// Full revision hash.
    pub sha: String,
    /// Author name.
    pub author: String,
    /// Commit timestamp.
    pub committed_at: DateTime<Utc>,
    /// Subject line.
    pub message: String,
}

/// Drives the git synchronization sequence for build requests.
pub struct RevisionSync {
    base_dir: PathBuf,
    git_path: String,
    commands: GitCommands,
    runner: CommandRunner,
}

impl RevisionSync {
    pub fn new(base_dir: impl Into<PathBuf>, runner: CommandRunner) -> Self {
        RevisionSync {
            base_dir: base_dir.into(),
            git_path: "git".to_string(),
            commands: GitCommands::default(),
            runner,
        }
    }

    /// Override the git binary path.
    pub fn with_git_path(mut self, git_path: impl Into<String>) -> Self {
        self.git_path = git_path.into();
        self
    }

    /// Override the command templates.
    pub fn with_commands(mut self, commands: GitCommands) -> Self {
        self.commands = commands;
        self
    }

    /// Deterministic working directory for a project.
    ///
    /// Keyed by a stable hash of (repository, branch): the same
    /// project+branch always maps to the same directory, and distinct
    /// branches of the same repository never collide.
    pub fn build_dir(&self, project: &Project) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(project.repository().as_bytes());
        hasher.update(project.branch().as_bytes());
        let digest = hex::encode(hasher.finalize());
        self.base_dir.join(&digest[..12])
    }

    /// Bring the working directory to the requested revision and return
    /// its metadata.
    pub async fn synchronize(&self, request: &BuildRequest) -> Result<ResolvedCommit> {
        let project = request.project.as_ref();
        let dir = self.build_dir(project);
        let sync = !request.flags.local;

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| BuildError::Workspace {
                project: project.slug().to_string(),
                source,
            })?;

        if !dir.join(".git").exists() {
            let output = self
                .git(&self.commands.clone, project, &dir, None, request)
                .await?;
            if !output.success {
                return Err(BuildError::Clone {
                    project: project.slug().to_string(),
                });
            }
        }

        if sync {
            let output = self
                .git(&self.commands.fetch, project, &dir, None, request)
                .await?;
            if !output.success {
                return Err(BuildError::Fetch {
                    project: project.slug().to_string(),
                });
            }
        }

        let output = self
            .git(&self.commands.checkout, project, &dir, None, request)
            .await?;
        if !output.success {
            return Err(BuildError::Checkout {
                project: project.slug().to_string(),
                branch: project.branch().to_string(),
            });
        }

        if sync {
            let output = self
                .git(&self.commands.submodules, project, &dir, None, request)
                .await?;
            if !output.success {
                return Err(BuildError::Submodules {
                    project: project.slug().to_string(),
                });
            }
        }

        // Revision resolution is an explicit step rather than a side
        // effect of checkout+reset: the concrete hash is needed before
        // the duplicate-build decision.
        let revision = if request.wants_branch_tip() {
            self.resolve_head(&dir, project).await?
        } else {
            request.revision.clone().unwrap_or_default()
        };

        let output = self
            .git(&self.commands.reset, project, &dir, Some(&revision), request)
            .await?;
        if !output.success {
            return Err(BuildError::Revision {
                project: project.slug().to_string(),
                revision,
            });
        }

        let output = self
            .git(&self.commands.show, project, &dir, Some(&revision), request)
            .await?;
        if !output.success {
            return Err(BuildError::Metadata {
                project: project.slug().to_string(),
            });
        }

        self.parse_metadata(&output, project)
    }

    /// Read the branch tip from the repository head reference, following
    /// one level of symbolic indirection.
    async fn resolve_head(&self, dir: &Path, project: &Project) -> Result<String> {
        let unresolvable = || BuildError::Head {
            project: project.slug().to_string(),
            branch: project.branch().to_string(),
        };

        let head = tokio::fs::read_to_string(dir.join(".git/HEAD"))
            .await
            .map_err(|_| unresolvable())?;
        let head = head.trim();

        match head.strip_prefix("ref: ") {
            Some(reference) => {
                let sha = tokio::fs::read_to_string(dir.join(".git").join(reference))
                    .await
                    .map_err(|_| unresolvable())?;
                let sha = sha.trim();
                if sha.is_empty() {
                    return Err(unresolvable());
                }
                Ok(sha.to_string())
            }
            None if !head.is_empty() => Ok(head.to_string()),
            None => Err(unresolvable()),
        }
    }

    fn parse_metadata(&self, output: &ProcessOutput, project: &Project) -> Result<ResolvedCommit> {
        let unreadable = || BuildError::Metadata {
            project: project.slug().to_string(),
        };

        let mut lines = output.stdout.splitn(4, '\n');
        let sha = lines.next().filter(|s| !s.is_empty()).ok_or_else(unreadable)?;
        let author = lines.next().ok_or_else(unreadable)?;
        let date = lines.next().ok_or_else(unreadable)?;
        let message = lines.next().unwrap_or("").trim();

        let committed_at = DateTime::parse_from_str(date.trim(), "%Y-%m-%d %H:%M:%S %z")
            .map_err(|_| unreadable())?
            .with_timezone(&Utc);

        Ok(ResolvedCommit {
            sha: sha.trim().to_string(),
            author: author.trim().to_string(),
            committed_at,
            message: message.to_string(),
        })
    }

    /// Render a template and run it, tracing the command line through the
    /// request stream.
    async fn git(
        &self,
        template: &[String],
        project: &Project,
        dir: &Path,
        revision: Option<&str>,
        request: &BuildRequest,
    ) -> Result<ProcessOutput> {
        let command = self.render(template, project, dir, revision);
        request.emit(StreamKind::Out, &format!("Running \"{}\"", command.join(" ")));
        debug!(project = %project.slug(), command = %command.join(" "), "git");
        let output = self
            .runner
            .run(&command, dir, request.stream.as_deref())
            .await?;
        Ok(output)
    }

    fn render(
        &self,
        template: &[String],
        project: &Project,
        dir: &Path,
        revision: Option<&str>,
    ) -> Vec<String> {
        let dir = dir.to_string_lossy();
        let remote_branch = format!("origin/{}", project.branch());
        let vars = [
            ("{repo}", project.repository()),
            ("{dir}", dir.as_ref()),
            ("{branch}", remote_branch.as_str()),
            ("{local_branch}", project.branch()),
            ("{revision}", revision.unwrap_or("")),
            ("{format}", SHOW_FORMAT),
        ];

        let mut command = Vec::with_capacity(template.len() + 1);
        command.push(self.git_path.clone());
        for arg in template {
            let mut rendered = arg.clone();
            for (token, value) in &vars {
                if rendered.contains(token) {
                    rendered = rendered.replace(token, value);
                }
            }
            command.push(rendered);
        }
        command
    }
}
