//! Build request carrier and flags.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use capstan_state::CommitRecord;

use crate::project::Project;

/// Output channel a streamed line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Standard output.
    Out,
    /// Standard error.
    Err,
}

/// Callback receiving live output lines while a build runs.
///
/// Receives the synthetic `BUILD START` marker, a `Running "…"` trace for
/// every git command, and each line of process output as it arrives.
pub type StreamCallback = dyn Fn(StreamKind, &str) + Send + Sync;

/// Flags modulating a single build attempt. Independently combinable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFlags {
    /// Bypass the "already building" and "already built" short-circuits.
    pub force: bool,
    /// Skip network synchronization (fetch + submodule update); build the
    /// working copy from local history.
    pub local: bool,
    /// Suppress the notification phase.
    pub silent: bool,
}

impl BuildFlags {
    pub fn with_force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn with_local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn with_silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// Per-invocation carrier threaded through the pipeline phases.
///
/// Created fresh for every `build()` call and discarded when the pipeline
/// completes or halts; only the commit record it produces persists.
pub struct BuildRequest {
    /// The project being built.
    pub project: Arc<Project>,
    /// Requested revision; `None` or `"HEAD"` means the tip of the
    /// tracked branch.
    pub revision: Option<String>,
    /// Flags for this attempt.
    pub flags: BuildFlags,
    /// Optional live-output callback.
    pub stream: Option<Arc<StreamCallback>>,
    /// The resolved commit, attached once synchronization has run.
    pub commit: Option<CommitRecord>,
}

impl BuildRequest {
    pub fn new(
        project: Arc<Project>,
        revision: Option<String>,
        flags: BuildFlags,
        stream: Option<Arc<StreamCallback>>,
    ) -> Self {
        BuildRequest {
            project,
            revision,
            flags,
            stream,
            commit: None,
        }
    }

    /// Forward a line to the stream callback, if one is attached.
    pub(crate) fn emit(&self, kind: StreamKind, line: &str) {
        if let Some(cb) = self.stream.as_deref() {
            cb(kind, line);
        }
    }

    /// The effective revision request: `None` and the `"HEAD"` sentinel
    /// both mean "resolve the branch tip".
    pub(crate) fn wants_branch_tip(&self) -> bool {
        match self.revision.as_deref() {
            None | Some("HEAD") => true,
            Some(_) => false,
        }
    }
}
