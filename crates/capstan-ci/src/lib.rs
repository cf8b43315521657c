//! Capstan CI - single-host build orchestration.
//!
//! Given a registered project (repository, tracked branch, build
//! command), Capstan synchronizes a working copy to a target revision,
//! executes the build command, classifies the outcome into a commit
//! record, and fans the result out to notification sinks.
//!
//! The pipeline runs three fixed phase groups:
//! - pre-build: concurrency guard, git synchronization, duplicate-build
//!   suppression
//! - build: script materialization, bounded execution, classification
//! - post-build: notification fan-out
//!
//! Storage is consumed through the `BuildStore` trait from
//! `capstan-state`; notification sinks implement `Notifier`.

pub mod config;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod project;
pub mod request;
pub mod runner;
pub mod sync;

// Re-export key types
pub use config::{CapstanConfig, DEFAULT_TIMEOUT_SECS};
pub use error::{BuildError, Result, SpawnError};
pub use notify::Notifier;
pub use orchestrator::Capstan;
pub use pipeline::{BuildOutcome, BuildPipeline};
pub use project::Project;
pub use request::{BuildFlags, BuildRequest, StreamCallback, StreamKind};
pub use runner::{CommandRunner, ProcessOutput};
pub use sync::{GitCommands, ResolvedCommit, RevisionSync};
