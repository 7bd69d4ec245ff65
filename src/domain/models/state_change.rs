//! State change event family.
//!
//! The inbound `StateChange` union is what producers hand to the
//! handler. Container and managed-agent changes are batched per task and
//! ride along on the next task-level change for the same ARN; only
//! task-level changes are submitted to the control plane directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::container::{Container, ContainerStatus, ManagedAgent, ManagedAgentStatus};
use super::task::{Task, TaskStatus};

/// Metadata reported separately from container status, e.g. a network
/// interface handle. Acknowledgement is one-shot and expires.
#[derive(Debug)]
pub struct Attachment {
    /// Opaque identifier issued by the control plane.
    pub arn: String,
    /// Acknowledgement deadline; past it the attachment is abandoned.
    pub expires_at: DateTime<Utc>,
    sent: AtomicBool,
}

impl Attachment {
    pub fn new(arn: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            arn: arn.into(),
            expires_at,
            sent: AtomicBool::new(false),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.sent.load(Ordering::Acquire)
    }

    pub fn set_sent(&self) {
        self.sent.store(true, Ordering::Release);
    }

    /// Whether the attachment still needs acknowledging: unsent and
    /// within its deadline.
    pub fn should_be_acknowledged(&self) -> bool {
        !self.is_sent() && self.expires_at > Utc::now()
    }
}

/// A container lifecycle transition, destined to be attached to the next
/// task-level submission for the same task.
#[derive(Debug, Clone)]
pub struct ContainerStateChange {
    pub task_arn: String,
    /// Name of the container within the task definition.
    pub container_name: String,
    /// Runtime identifier, when the container runtime has assigned one.
    pub runtime_id: Option<String>,
    pub status: ContainerStatus,
    pub exit_code: Option<i32>,
    pub reason: Option<String>,
    /// The live container whose sent-status gates resubmission.
    pub container: Arc<Container>,
}

impl ContainerStateChange {
    pub fn new(task_arn: impl Into<String>, container: Arc<Container>, status: ContainerStatus) -> Self {
        Self {
            task_arn: task_arn.into(),
            container_name: container.name.clone(),
            runtime_id: None,
            status,
            exit_code: None,
            reason: None,
            container,
        }
    }
}

/// A managed-agent lifecycle transition, batched like container changes.
#[derive(Debug, Clone)]
pub struct ManagedAgentStateChange {
    pub task_arn: String,
    /// Name of the container the agent is attached to.
    pub container_name: String,
    pub status: ManagedAgentStatus,
    pub reason: Option<String>,
    /// The live agent whose sent-status gates resubmission.
    pub agent: Arc<ManagedAgent>,
}

impl ManagedAgentStateChange {
    pub fn new(
        task_arn: impl Into<String>,
        container_name: impl Into<String>,
        agent: Arc<ManagedAgent>,
        status: ManagedAgentStatus,
    ) -> Self {
        Self {
            task_arn: task_arn.into(),
            container_name: container_name.into(),
            status,
            reason: None,
            agent,
        }
    }
}

/// A task lifecycle transition, the unit of submission to the control
/// plane. Carries any batched container and managed-agent changes and an
/// optional attachment.
#[derive(Debug, Clone)]
pub struct TaskStateChange {
    pub task_arn: String,
    pub status: TaskStatus,
    pub reason: Option<String>,
    pub containers: Vec<ContainerStateChange>,
    pub managed_agents: Vec<ManagedAgentStateChange>,
    pub attachment: Option<Arc<Attachment>>,
    /// The live task whose sent-status gates resubmission.
    pub task: Arc<Task>,

    pub pull_started_at: Option<DateTime<Utc>>,
    pub pull_stopped_at: Option<DateTime<Utc>>,
    pub execution_stopped_at: Option<DateTime<Utc>>,
}

impl TaskStateChange {
    pub fn new(task: Arc<Task>, status: TaskStatus) -> Self {
        Self {
            task_arn: task.arn.clone(),
            status,
            reason: None,
            containers: Vec::new(),
            managed_agents: Vec::new(),
            attachment: None,
            task,
            pull_started_at: None,
            pull_stopped_at: None,
            execution_stopped_at: None,
        }
    }

    /// Copy the pull and execution timestamps from the task. Timestamps
    /// already present on the change are left untouched.
    pub fn set_task_timestamps(&mut self) {
        if self.pull_started_at.is_none() {
            self.pull_started_at = self.task.pull_started_at;
        }
        if self.pull_stopped_at.is_none() {
            self.pull_stopped_at = self.task.pull_stopped_at;
        }
        if self.execution_stopped_at.is_none() {
            self.execution_stopped_at = self.task.execution_stopped_at;
        }
    }
}

/// The closed family of events accepted by `TaskEventHandler::submit`.
#[derive(Debug, Clone)]
pub enum StateChange {
    Task(TaskStateChange),
    Container(ContainerStateChange),
    ManagedAgent(ManagedAgentStateChange),
}

impl StateChange {
    /// The sharding key of the event.
    pub fn task_arn(&self) -> &str {
        match self {
            Self::Task(change) => &change.task_arn,
            Self::Container(change) => &change.task_arn,
            Self::ManagedAgent(change) => &change.task_arn,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Task(_) => "task",
            Self::Container(_) => "container",
            Self::ManagedAgent(_) => "managed_agent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_attachment_acknowledgeable_until_sent() {
        let attachment = Attachment::new("arn:attachment/eni-1", Utc::now() + Duration::minutes(5));
        assert!(attachment.should_be_acknowledged());

        attachment.set_sent();
        assert!(attachment.is_sent());
        assert!(!attachment.should_be_acknowledged());
    }

    #[test]
    fn test_expired_attachment_is_not_acknowledgeable() {
        let attachment = Attachment::new("arn:attachment/eni-2", Utc::now() - Duration::seconds(1));
        assert!(!attachment.should_be_acknowledged());
    }

    #[test]
    fn test_task_timestamps_copied_from_task() {
        let mut task = Task::new("arn:task/1", TaskStatus::Running);
        let pulled = Utc::now();
        task.pull_started_at = Some(pulled);
        let mut change = TaskStateChange::new(Arc::new(task), TaskStatus::Running);

        change.set_task_timestamps();
        assert_eq!(change.pull_started_at, Some(pulled));
        assert!(change.pull_stopped_at.is_none());
    }

    #[test]
    fn test_existing_timestamps_not_overwritten() {
        let mut task = Task::new("arn:task/1", TaskStatus::Running);
        task.pull_started_at = Some(Utc::now() - Duration::minutes(1));
        let explicit = Utc::now();
        let mut change = TaskStateChange::new(Arc::new(task), TaskStatus::Running);
        change.pull_started_at = Some(explicit);

        change.set_task_timestamps();
        assert_eq!(change.pull_started_at, Some(explicit));
    }

    #[test]
    fn test_state_change_task_arn() {
        let task = Arc::new(Task::new("arn:task/9", TaskStatus::Running));
        let change = StateChange::Task(TaskStateChange::new(task, TaskStatus::Running));
        assert_eq!(change.task_arn(), "arn:task/9");
        assert_eq!(change.kind(), "task");
    }
}
