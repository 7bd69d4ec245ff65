//! Periodic drain of batched container and managed-agent events.
//!
//! Long-running tasks can go a long time between task-level
//! transitions, which would strand their batched container and
//! managed-agent changes. This ticker wakes on a jittered interval and
//! synthesizes a task-level flush for every ARN with a non-empty batch,
//! skipping tasks the engine no longer tracks and tasks at or beyond
//! stopped.

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::models::StateChange;
use crate::services::event_handler::TaskEventHandler;

/// Background drain loop. One per handler.
pub struct DrainTicker {
    handler: TaskEventHandler,
    min_interval: Duration,
    max_interval: Duration,
}

impl DrainTicker {
    pub fn new(handler: TaskEventHandler) -> Self {
        let min_interval = handler.config().min_drain_frequency();
        let max_interval = handler.config().max_drain_frequency();
        Self {
            handler,
            min_interval,
            max_interval,
        }
    }

    /// Run until the handler's cancellation token fires.
    pub async fn run(self) {
        let cancel = self.handler.cancel_token().clone();
        loop {
            let interval = self.jittered_interval();
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("stopping periodic state change drain ticker");
                    return;
                }
                _ = sleep(interval) => {}
            }

            self.drain_once().await;
        }
    }

    /// One tick: synthesize and submit flush events for every ARN with
    /// batched changes. Submission errors are logged, never propagated;
    /// the batch stays put and the next tick retries.
    pub async fn drain_once(&self) {
        for change in self.handler.task_state_changes_to_send().await {
            debug!(
                task_arn = %change.task_arn,
                status = %change.status,
                "submitting synthesized flush for batched events"
            );
            if let Err(err) = self.handler.submit(StateChange::Task(change)).await {
                warn!(error = %err, "failed to submit synthesized drain event");
            }
        }
    }

    fn jittered_interval(&self) -> Duration {
        let min_ms = self.min_interval.as_millis() as u64;
        let max_ms = self.max_interval.as_millis() as u64;
        if max_ms <= min_ms {
            return self.min_interval;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }
}
