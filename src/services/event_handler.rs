//! Task state change event handler.
//!
//! Owns the per-task queue registry and the two batch buffers, bounds
//! concurrent control-plane submissions with a permit pool, and spawns
//! one submitter worker per active task ARN. Container and
//! managed-agent changes are batched here until the next task-level
//! change for the same ARN flushes them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::domain::error::{ControlPlaneError, HandlerError};
use crate::domain::models::{
    ContainerStateChange, HandlerConfig, ManagedAgentStateChange, StateChange, TaskStateChange,
};
use crate::domain::ports::{ControlPlaneClient, SentStatusRepository, TaskEngineState};
use crate::services::backoff::{retry_with_backoff, ExponentialBackoff};
use crate::services::drain_ticker::DrainTicker;
use crate::services::event_queue::{EnqueueOutcome, TaskEventQueue};
use crate::services::sendable_event::SendableEvent;

/// Queue registry and batch buffers, all guarded by one lock.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) queues: HashMap<String, Arc<TaskEventQueue>>,
    pub(crate) container_batches: HashMap<String, Vec<ContainerStateChange>>,
    pub(crate) managed_agent_batches: HashMap<String, Vec<ManagedAgentStateChange>>,
}

/// Point-in-time counters, for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerStats {
    /// Task ARNs with a live queue entry.
    pub active_task_queues: usize,
    /// Container changes waiting to ride on a task change.
    pub batched_container_events: usize,
    /// Managed-agent changes waiting to ride on a task change.
    pub batched_managed_agent_events: usize,
}

struct HandlerShared {
    registry: RwLock<Registry>,
    submit_semaphore: Arc<Semaphore>,
    client: Arc<dyn ControlPlaneClient>,
    sent_status: Arc<dyn SentStatusRepository>,
    engine: Arc<dyn TaskEngineState>,
    config: HandlerConfig,
    cancel: CancellationToken,
}

/// Task state change event handler.
///
/// Cheap to clone; all clones share one registry. Construct with
/// [`TaskEventHandler::new`] and call [`start_drain_ticker`] once to
/// begin periodic flushing of stranded batches.
///
/// [`start_drain_ticker`]: TaskEventHandler::start_drain_ticker
#[derive(Clone)]
pub struct TaskEventHandler {
    shared: Arc<HandlerShared>,
}

impl TaskEventHandler {
    pub fn new(
        config: HandlerConfig,
        client: Arc<dyn ControlPlaneClient>,
        sent_status: Arc<dyn SentStatusRepository>,
        engine: Arc<dyn TaskEngineState>,
        cancel: CancellationToken,
    ) -> Self {
        let submit_semaphore = Arc::new(Semaphore::new(config.concurrent_event_calls));
        Self {
            shared: Arc::new(HandlerShared {
                registry: RwLock::new(Registry::default()),
                submit_semaphore,
                client,
                sent_status,
                engine,
                config,
                cancel,
            }),
        }
    }

    /// Spawn the background drain ticker. It periodically synthesizes
    /// task-level flushes for ARNs whose batch buffers are non-empty,
    /// and exits when the handler's cancellation token fires.
    pub fn start_drain_ticker(&self) -> JoinHandle<()> {
        let ticker = DrainTicker::new(self.clone());
        tokio::spawn(ticker.run())
    }

    /// Queue a state change for reporting.
    ///
    /// Container and managed-agent changes are batched until the next
    /// task-level change for the same ARN. A task-level change flushes
    /// the batches, joins the per-task queue, and is submitted
    /// asynchronously; this method never waits on the control plane.
    #[instrument(skip_all, fields(task_arn = %change.task_arn(), kind = change.kind()), err)]
    pub async fn submit(&self, change: StateChange) -> Result<(), HandlerError> {
        if change.task_arn().is_empty() {
            return Err(HandlerError::MissingTaskArn);
        }

        let mut registry = self.shared.registry.write().await;
        match change {
            StateChange::Task(task_change) => {
                self.flush_batch_locked(&mut registry, task_change).await;
            }
            StateChange::Container(container_change) => {
                debug!(container = %container_change.container_name, "batching container event");
                registry
                    .container_batches
                    .entry(container_change.task_arn.clone())
                    .or_default()
                    .push(container_change);
            }
            StateChange::ManagedAgent(agent_change) => {
                debug!(agent = %agent_change.agent.name, "batching managed agent event");
                registry
                    .managed_agent_batches
                    .entry(agent_change.task_arn.clone())
                    .or_default()
                    .push(agent_change);
            }
        }
        Ok(())
    }

    /// Attach all batched container and managed-agent changes for the
    /// task to the change, enqueue it, and start a submitter worker if
    /// the queue was idle. Caller holds the registry write lock.
    async fn flush_batch_locked(&self, registry: &mut Registry, mut change: TaskStateChange) {
        if let Some(batched) = registry.container_batches.remove(&change.task_arn) {
            change.containers.extend(batched);
        }
        if let Some(batched) = registry.managed_agent_batches.remove(&change.task_arn) {
            change.managed_agents.extend(batched);
        }

        let queue = registry
            .queues
            .entry(change.task_arn.clone())
            .or_insert_with(|| {
                debug!(task_arn = %change.task_arn, "tracking events for new task");
                Arc::new(TaskEventQueue::new(change.task_arn.clone()))
            })
            .clone();

        let event = SendableEvent::from_task_change(change);
        if queue.enqueue(event).await == EnqueueOutcome::SpawnSubmitter {
            let handler = self.clone();
            tokio::spawn(async move {
                handler.submit_task_events(queue).await;
            });
        }
    }

    /// Submitter worker: drain one queue front-first, retrying each
    /// event with fresh backoff until the queue empties or the handler
    /// is cancelled.
    async fn submit_task_events(&self, queue: Arc<TaskEventQueue>) {
        let mut backoff = ExponentialBackoff::from_config(&self.shared.config.backoff);

        loop {
            // Fresh schedule per event: a slow retry on one event must
            // not penalize the next.
            backoff.reset();

            let drained = retry_with_backoff(&mut backoff, &self.shared.cancel, || {
                let queue = queue.clone();
                let shared = self.shared.clone();
                async move {
                    let _permit = shared
                        .submit_semaphore
                        .acquire()
                        .await
                        .map_err(|_| ControlPlaneError::Internal("permit pool closed".to_string()))?;
                    queue
                        .submit_first_event(shared.client.as_ref(), shared.sent_status.as_ref())
                        .await
                }
            })
            .await;

            match drained {
                Some(true) => break,
                Some(false) => continue,
                None => {
                    debug!(task_arn = queue.task_arn(), "submitter cancelled mid-drain");
                    queue.abort_sending().await;
                    break;
                }
            }
        }

        self.remove_task_events(queue.task_arn()).await;
    }

    /// Drop the registry entry for a task whose submitter has exited.
    /// The entry stays if a producer re-activated the queue in the
    /// window between the final drain and this call.
    async fn remove_task_events(&self, task_arn: &str) {
        let mut registry = self.shared.registry.write().await;
        if let Some(queue) = registry.queues.get(task_arn) {
            if queue.is_idle().await {
                debug!(task_arn, "removing drained task event queue");
                registry.queues.remove(task_arn);
            }
        }
    }

    /// Synthesize flush events for every ARN with batched changes whose
    /// task is known to the engine and not yet stopped. Used by the
    /// drain ticker; takes the registry read lock only.
    pub(crate) async fn task_state_changes_to_send(&self) -> Vec<TaskStateChange> {
        let registry = self.shared.registry.read().await;
        let mut events: HashMap<String, TaskStateChange> = HashMap::new();

        for task_arn in registry.container_batches.keys() {
            if let Some(change) = self.synthesize_flush(task_arn).await {
                events.insert(task_arn.clone(), change);
            }
        }
        // An ARN present in both buffers keeps the entry built above.
        for task_arn in registry.managed_agent_batches.keys() {
            if events.contains_key(task_arn) {
                continue;
            }
            if let Some(change) = self.synthesize_flush(task_arn).await {
                events.insert(task_arn.clone(), change);
            }
        }

        events.into_values().collect()
    }

    /// Build a synthetic task change carrying the task's current known
    /// status. Skips ARNs the engine is not tracking and tasks at or
    /// beyond stopped: the control plane rejects container updates for
    /// stopped tasks, so their batches wait for the terminal task event.
    async fn synthesize_flush(&self, task_arn: &str) -> Option<TaskStateChange> {
        let task = self.shared.engine.task_by_arn(task_arn)?;
        let known_status = task.known_status().await;
        if known_status.is_stopped() {
            return None;
        }

        let mut change = TaskStateChange::new(task, known_status);
        change.set_task_timestamps();
        Some(change)
    }

    pub(crate) fn config(&self) -> &HandlerConfig {
        &self.shared.config
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.shared.cancel
    }

    /// Current registry counters.
    pub async fn stats(&self) -> HandlerStats {
        let registry = self.shared.registry.read().await;
        HandlerStats {
            active_task_queues: registry.queues.len(),
            batched_container_events: registry.container_batches.values().map(Vec::len).sum(),
            batched_managed_agent_events: registry
                .managed_agent_batches
                .values()
                .map(Vec::len)
                .sum(),
        }
    }
}

impl std::fmt::Debug for TaskEventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskEventHandler")
            .field("concurrent_event_calls", &self.shared.config.concurrent_event_calls)
            .finish_non_exhaustive()
    }
}
