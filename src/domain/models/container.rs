//! Container and managed-agent domain models.
//!
//! Mirrors the task model: each entity carries a shared sent-status cell
//! that state change events consult to decide whether a report is still
//! worth making.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Lifecycle status of a container. Ordinal, declared in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    None,
    Pulled,
    Created,
    Running,
    Stopped,
}

impl Default for ContainerStatus {
    fn default() -> Self {
        Self::None
    }
}

impl ContainerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pulled => "pulled",
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a managed agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedAgentStatus {
    None,
    Created,
    Running,
    Stopped,
}

impl Default for ManagedAgentStatus {
    fn default() -> Self {
        Self::None
    }
}

impl ManagedAgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ManagedAgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A container belonging to a task.
#[derive(Debug)]
pub struct Container {
    /// Name of the container within its task definition.
    pub name: String,
    sent_status: RwLock<ContainerStatus>,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent_status: RwLock::new(ContainerStatus::None),
        }
    }

    /// Highest status already reported to the control plane.
    pub async fn sent_status(&self) -> ContainerStatus {
        *self.sent_status.read().await
    }

    pub async fn set_sent_status(&self, status: ContainerStatus) {
        *self.sent_status.write().await = status;
    }
}

/// An auxiliary process attached to a container, with its own lifecycle.
#[derive(Debug)]
pub struct ManagedAgent {
    pub name: String,
    sent_status: RwLock<ManagedAgentStatus>,
}

impl ManagedAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent_status: RwLock::new(ManagedAgentStatus::None),
        }
    }

    pub async fn sent_status(&self) -> ManagedAgentStatus {
        *self.sent_status.read().await
    }

    pub async fn set_sent_status(&self, status: ManagedAgentStatus) {
        *self.sent_status.write().await = status;
    }
}
