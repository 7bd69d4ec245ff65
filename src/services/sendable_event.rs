//! Sendable events and their submission paths.
//!
//! A `SendableEvent` wraps one submittable state change queued for a
//! task. Its three predicates answer "should this still be sent?"; when
//! none holds the event has been superseded and is discarded without a
//! remote call.

use tracing::{debug, warn};

use crate::domain::error::ControlPlaneError;
use crate::domain::models::{ContainerStateChange, TaskStateChange};
use crate::domain::ports::{ControlPlaneClient, SentStatusRepository};

/// One submittable state change.
#[derive(Debug, Clone)]
pub enum SendableEvent {
    /// A task-level change with a reportable status.
    Task(TaskStateChange),
    /// A standalone container change.
    Container(ContainerStateChange),
    /// A task-level change whose only payload is attachment metadata.
    TaskAttachment(TaskStateChange),
}

/// What `send` did with the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The change was submitted and marked sent.
    Submitted,
    /// No predicate held; the event is superseded and must be dropped.
    Redundant,
}

impl SendableEvent {
    /// Wrap a task-level change. A change with no reportable status but
    /// a populated attachment is an attachment acknowledgement; anything
    /// else submits as a task change.
    pub fn from_task_change(change: TaskStateChange) -> Self {
        if !change.status.is_reportable() && change.attachment.is_some() {
            Self::TaskAttachment(change)
        } else {
            Self::Task(change)
        }
    }

    /// The sharding key of the underlying change.
    pub fn task_arn(&self) -> &str {
        match self {
            Self::Task(change) | Self::TaskAttachment(change) => &change.task_arn,
            Self::Container(change) => &change.task_arn,
        }
    }

    /// Whether this event must be submitted as a container change: it
    /// wraps one, and the container has not yet reported this status.
    pub async fn container_should_be_sent(&self) -> bool {
        match self {
            Self::Container(change) => change.container.sent_status().await < change.status,
            _ => false,
        }
    }

    /// Whether this event must be submitted as a task change: it wraps
    /// one with a reportable status the task has not yet reported.
    pub async fn task_should_be_sent(&self) -> bool {
        match self {
            Self::Task(change) => {
                change.status.is_reportable() && change.task.sent_status().await < change.status
            }
            _ => false,
        }
    }

    /// Whether this event must be submitted as an attachment
    /// acknowledgement: the attachment is unsent and unexpired.
    pub fn task_attachment_should_be_sent(&self) -> bool {
        match self {
            Self::TaskAttachment(change) => change
                .attachment
                .as_ref()
                .is_some_and(|attachment| attachment.should_be_acknowledged()),
            _ => false,
        }
    }

    /// Submit the event on the path selected by the first predicate that
    /// holds. Predicate precedence is fixed: container, then task, then
    /// attachment.
    ///
    /// On success the corresponding entities are marked sent and the
    /// markers persisted; persistence failures are logged, never
    /// returned, since the control plane has already accepted the
    /// change.
    pub async fn send(
        &self,
        client: &dyn ControlPlaneClient,
        sent_status: &dyn SentStatusRepository,
    ) -> Result<SendOutcome, ControlPlaneError> {
        if self.container_should_be_sent().await {
            if let Self::Container(change) = self {
                client.submit_container_state_change(change.clone()).await?;
                mark_container_sent(change, sent_status).await;
                return Ok(SendOutcome::Submitted);
            }
        }

        if self.task_should_be_sent().await {
            if let Self::Task(change) = self {
                client.submit_task_state_change(change.clone()).await?;
                mark_task_change_sent(change, sent_status).await;
                return Ok(SendOutcome::Submitted);
            }
        }

        if self.task_attachment_should_be_sent() {
            if let Self::TaskAttachment(change) = self {
                client.submit_task_state_change(change.clone()).await?;
                mark_attachment_sent(change, sent_status).await;
                return Ok(SendOutcome::Submitted);
            }
        }

        debug!(task_arn = self.task_arn(), "event superseded, discarding without submission");
        Ok(SendOutcome::Redundant)
    }
}

async fn mark_container_sent(change: &ContainerStateChange, repo: &dyn SentStatusRepository) {
    change.container.set_sent_status(change.status).await;
    if let Err(err) = repo.save_container(&change.container).await {
        warn!(
            error = %err,
            container = %change.container_name,
            "failed to persist container sent status"
        );
    }
}

async fn mark_task_change_sent(change: &TaskStateChange, repo: &dyn SentStatusRepository) {
    change.task.set_sent_status(change.status).await;

    // Everything that rode along on this submission is now reported too.
    for container_change in &change.containers {
        container_change
            .container
            .set_sent_status(container_change.status)
            .await;
        if let Err(err) = repo.save_container(&container_change.container).await {
            warn!(
                error = %err,
                container = %container_change.container_name,
                "failed to persist container sent status"
            );
        }
    }
    for agent_change in &change.managed_agents {
        agent_change.agent.set_sent_status(agent_change.status).await;
        if let Err(err) = repo.save_managed_agent(&agent_change.agent).await {
            warn!(
                error = %err,
                agent = %agent_change.agent.name,
                "failed to persist managed agent sent status"
            );
        }
    }

    if let Err(err) = repo.save_task(&change.task).await {
        warn!(error = %err, task_arn = %change.task_arn, "failed to persist task sent status");
    }
}

async fn mark_attachment_sent(change: &TaskStateChange, repo: &dyn SentStatusRepository) {
    if let Some(attachment) = &change.attachment {
        attachment.set_sent();
        if let Err(err) = repo.save_attachment(attachment).await {
            warn!(
                error = %err,
                attachment = %attachment.arn,
                "failed to persist attachment sent status"
            );
        }
    }
}
