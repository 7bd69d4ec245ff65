//! Task domain model.
//!
//! A task is the unit of scheduling: a group of containers plus optional
//! managed agents, identified by an opaque ARN. The handler only ever
//! reads two live facts about a task, its known status and the highest
//! status already reported to the control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Lifecycle status of a task.
///
/// The enum is ordinal: variants are declared in lifecycle order and the
/// derived ordering is load-bearing. `Stopped` is terminal; the control
/// plane rejects container or managed-agent updates beyond it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// No status has been established yet.
    None,
    /// Resources for the task are being provisioned.
    Provisioning,
    /// All containers are created.
    Created,
    /// The task is running.
    Running,
    /// The task has stopped.
    Stopped,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::None
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Provisioning => "provisioning",
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }

    /// Check if this status is at or beyond the terminal threshold.
    pub fn is_stopped(&self) -> bool {
        *self >= Self::Stopped
    }

    /// Check if the control plane accepts a report of this status.
    pub fn is_reportable(&self) -> bool {
        *self != Self::None
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scheduled task as known to the task engine.
///
/// Shared between the engine, the handler, and in-flight state change
/// events through `Arc<Task>`; the status cells are independently locked
/// so events can consult and advance them without coordination.
#[derive(Debug)]
pub struct Task {
    /// Opaque identifier, the sharding key for all handler state.
    pub arn: String,

    known_status: RwLock<TaskStatus>,
    sent_status: RwLock<TaskStatus>,

    /// When image pulls for the task began.
    pub pull_started_at: Option<DateTime<Utc>>,
    /// When image pulls for the task finished.
    pub pull_stopped_at: Option<DateTime<Utc>>,
    /// When the last container of the task exited.
    pub execution_stopped_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(arn: impl Into<String>, known_status: TaskStatus) -> Self {
        Self {
            arn: arn.into(),
            known_status: RwLock::new(known_status),
            sent_status: RwLock::new(TaskStatus::None),
            pull_started_at: None,
            pull_stopped_at: None,
            execution_stopped_at: None,
        }
    }

    /// Current status as established by the task engine.
    pub async fn known_status(&self) -> TaskStatus {
        *self.known_status.read().await
    }

    pub async fn set_known_status(&self, status: TaskStatus) {
        *self.known_status.write().await = status;
    }

    /// Highest status already reported to the control plane.
    pub async fn sent_status(&self) -> TaskStatus {
        *self.sent_status.read().await
    }

    pub async fn set_sent_status(&self, status: TaskStatus) {
        *self.sent_status.write().await = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering_is_monotone() {
        assert!(TaskStatus::None < TaskStatus::Provisioning);
        assert!(TaskStatus::Provisioning < TaskStatus::Created);
        assert!(TaskStatus::Created < TaskStatus::Running);
        assert!(TaskStatus::Running < TaskStatus::Stopped);
    }

    #[test]
    fn test_stopped_threshold() {
        assert!(TaskStatus::Stopped.is_stopped());
        assert!(!TaskStatus::Running.is_stopped());
        assert!(!TaskStatus::None.is_stopped());
    }

    #[test]
    fn test_none_is_not_reportable() {
        assert!(!TaskStatus::None.is_reportable());
        assert!(TaskStatus::Provisioning.is_reportable());
        assert!(TaskStatus::Stopped.is_reportable());
    }

    #[tokio::test]
    async fn test_sent_status_starts_at_none() {
        let task = Task::new("arn:task/1", TaskStatus::Running);
        assert_eq!(task.known_status().await, TaskStatus::Running);
        assert_eq!(task.sent_status().await, TaskStatus::None);

        task.set_sent_status(TaskStatus::Running).await;
        assert_eq!(task.sent_status().await, TaskStatus::Running);
    }
}
