//! Per-task FIFO of sendable events.
//!
//! Events for one task ARN are serialized through this queue; a single
//! submitter worker drains it front-first while producers keep
//! appending. The `sending` flag and the FIFO live under one mutex so
//! the enqueue-or-spawn decision is atomic.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::error::ControlPlaneError;
use crate::domain::ports::{ControlPlaneClient, SentStatusRepository};
use crate::services::sendable_event::{SendOutcome, SendableEvent};

/// Result of an enqueue, reported from inside the critical section so
/// the caller cannot race an exiting worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The queue just became active; the caller must spawn a submitter.
    SpawnSubmitter,
    /// A submitter is already draining this queue.
    AlreadySending,
}

#[derive(Debug, Default)]
struct QueueState {
    events: VecDeque<SendableEvent>,
    sending: bool,
}

/// FIFO of sendable events for one task ARN.
#[derive(Debug)]
pub struct TaskEventQueue {
    task_arn: String,
    created_at: DateTime<Utc>,
    state: Mutex<QueueState>,
}

impl TaskEventQueue {
    pub fn new(task_arn: impl Into<String>) -> Self {
        Self {
            task_arn: task_arn.into(),
            created_at: Utc::now(),
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn task_arn(&self) -> &str {
        &self.task_arn
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append an event. If the queue was idle it is flagged as sending
    /// and the caller is told to spawn a submitter worker.
    pub async fn enqueue(&self, event: SendableEvent) -> EnqueueOutcome {
        let mut state = self.state.lock().await;
        state.events.push_back(event);

        if state.sending {
            debug!(task_arn = %self.task_arn, "submitter already active, queued event");
            EnqueueOutcome::AlreadySending
        } else {
            state.sending = true;
            EnqueueOutcome::SpawnSubmitter
        }
    }

    /// Attempt to submit the front event once.
    ///
    /// Returns `Ok(true)` when the queue is empty after this step (the
    /// `sending` flag has been cleared and the worker must exit) and
    /// `Ok(false)` when more events remain. A transient submission
    /// failure leaves the front event in place and is returned for the
    /// retry loop; a permanent rejection drops the front event and
    /// counts as a consumed step.
    ///
    /// The mutex is released around the remote call so producers can
    /// append while a submission is in flight. The front is stable in
    /// that window: this worker is the only consumer.
    pub async fn submit_first_event(
        &self,
        client: &dyn ControlPlaneClient,
        sent_status: &dyn SentStatusRepository,
    ) -> Result<bool, ControlPlaneError> {
        let front = {
            let mut state = self.state.lock().await;
            match state.events.front() {
                Some(event) => event.clone(),
                None => {
                    state.sending = false;
                    return Ok(true);
                }
            }
        };

        let result = front.send(client, sent_status).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(SendOutcome::Submitted) | Ok(SendOutcome::Redundant) => {
                state.events.pop_front();
            }
            Err(err) if err.is_invalid_parameter() => {
                warn!(
                    task_arn = %self.task_arn,
                    error = %err,
                    "event rejected with invalid parameters, removing"
                );
                state.events.pop_front();
            }
            Err(err) => return Err(err),
        }

        if state.events.is_empty() {
            state.sending = false;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Clear the sending flag without draining. Shutdown path only: the
    /// queue may still hold events.
    pub async fn abort_sending(&self) {
        let mut state = self.state.lock().await;
        state.sending = false;
    }

    /// True when the queue holds no events and no submitter is active.
    pub async fn is_idle(&self) -> bool {
        let state = self.state.lock().await;
        !state.sending && state.events.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.events.is_empty()
    }
}
