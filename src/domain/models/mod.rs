pub mod config;
pub mod container;
pub mod state_change;
pub mod task;

pub use config::{BackoffConfig, Config, HandlerConfig, LoggingConfig};
pub use container::{Container, ContainerStatus, ManagedAgent, ManagedAgentStatus};
pub use state_change::{
    Attachment, ContainerStateChange, ManagedAgentStateChange, StateChange, TaskStateChange,
};
pub use task::{Task, TaskStatus};
