//! Notification sink interface.

use async_trait::async_trait;

use capstan_state::CommitRecord;

/// A notification sink receiving every finished build.
///
/// Delivery is best-effort: the pipeline calls each sink once per
/// finished build, in registration order, and isolates failures - an
/// erroring sink is logged and skipped, it never fails the build or
/// blocks delivery to the remaining sinks.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a finished commit (status is `Success` or `Failed`).
    async fn notify(&self, commit: &CommitRecord) -> anyhow::Result<()>;
}
