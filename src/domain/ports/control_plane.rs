use async_trait::async_trait;

use crate::domain::error::ControlPlaneError;
use crate::domain::models::{ContainerStateChange, TaskStateChange};

/// Client interface for the remote control-plane API.
///
/// Implementations must be `Send + Sync`; the handler calls them from
/// many submitter workers concurrently. Calls may block for as long as
/// the underlying transport allows; the handler bounds concurrency, not
/// latency.
///
/// # Errors
/// Both operations distinguish permanent rejections
/// (`ControlPlaneError::InvalidParameter`, the event will never be
/// accepted) from transient failures (everything else, retried by the
/// caller indefinitely).
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Report a task state change, together with any attached container
    /// and managed-agent changes and optional attachment metadata.
    async fn submit_task_state_change(
        &self,
        change: TaskStateChange,
    ) -> Result<(), ControlPlaneError>;

    /// Report a standalone container state change.
    async fn submit_container_state_change(
        &self,
        change: ContainerStateChange,
    ) -> Result<(), ControlPlaneError>;
}
