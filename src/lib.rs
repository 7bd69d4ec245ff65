//! Herald - task state change reporting for a container agent.
//!
//! Accepts task, container, and managed-agent lifecycle events, batches
//! the container-scoped ones per task, and reports task-level changes to
//! the control plane with per-task serialization and bounded concurrency.

pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::error::{ControlPlaneError, HandlerError, SentStatusError};
pub use domain::models::{Config, HandlerConfig, StateChange};
pub use services::event_handler::TaskEventHandler;
