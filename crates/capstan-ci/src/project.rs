//! Project handle: the persisted record plus registered notification sinks.

use std::sync::Arc;

use capstan_state::ProjectRecord;

use crate::notify::Notifier;

/// A registered project: repository, tracked branch, build command, and
/// the notification sinks that receive every finished build.
///
/// The engine reads it only; the record half is what storage persists.
#[derive(Clone)]
pub struct Project {
    record: ProjectRecord,
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl Project {
    pub fn new(slug: &str, repository: &str, branch: &str, command: &str) -> Self {
        Project {
            record: ProjectRecord::new(slug, repository, branch, command),
            notifiers: Vec::new(),
        }
    }

    /// Register a notification sink. Sinks are notified in registration
    /// order.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn slug(&self) -> &str {
        &self.record.slug
    }

    pub fn repository(&self) -> &str {
        &self.record.repository
    }

    pub fn branch(&self) -> &str {
        &self.record.branch
    }

    /// The build command (multi-line shell script).
    pub fn command(&self) -> &str {
        &self.record.command
    }

    pub fn notifiers(&self) -> &[Arc<dyn Notifier>] {
        &self.notifiers
    }

    /// The serializable half handed to storage.
    pub fn record(&self) -> &ProjectRecord {
        &self.record
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("slug", &self.record.slug)
            .field("repository", &self.record.repository)
            .field("branch", &self.record.branch)
            .field("notifiers", &self.notifiers.len())
            .finish()
    }
}
