use async_trait::async_trait;

use crate::domain::error::SentStatusError;
use crate::domain::models::{Attachment, Container, ManagedAgent, Task};

/// Durable store for sent markers.
///
/// Every save records the entity's current sent-status so a restarted
/// agent does not re-report already acknowledged transitions. All
/// operations are idempotent: saving the same state twice is a no-op
/// from the store's perspective.
///
/// Failures here never fail a submission; the handler logs them and
/// moves on, since the control plane has already accepted the change.
#[async_trait]
pub trait SentStatusRepository: Send + Sync {
    async fn save_task(&self, task: &Task) -> Result<(), SentStatusError>;

    async fn save_container(&self, container: &Container) -> Result<(), SentStatusError>;

    async fn save_managed_agent(&self, agent: &ManagedAgent) -> Result<(), SentStatusError>;

    async fn save_attachment(&self, attachment: &Attachment) -> Result<(), SentStatusError>;
}
