//! Common test utilities for integration tests
//!
//! Provides shared fixtures and recording fakes for the handler's three
//! ports, used across multiple integration test files.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use herald::domain::error::{ControlPlaneError, SentStatusError};
use herald::domain::models::{
    Attachment, BackoffConfig, Container, ContainerStateChange, HandlerConfig, ManagedAgent, Task,
    TaskStateChange,
};
use herald::domain::ports::{ControlPlaneClient, SentStatusRepository, TaskEngineState};
use herald::TaskEventHandler;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Wait for an async condition to become true with timeout
///
/// Polls the predicate every 10ms until it returns true or the timeout
/// is reached.
#[allow(dead_code)]
pub async fn wait_for<F, Fut>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);

    while start.elapsed() < timeout {
        if predicate().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    false
}

/// Handler configuration tuned for tests: millisecond backoff, no
/// jitter, default permit pool.
#[allow(dead_code)]
pub fn fast_handler_config() -> HandlerConfig {
    HandlerConfig {
        backoff: BackoffConfig {
            submit_state_backoff_min_ms: 10,
            submit_state_backoff_max_ms: 100,
            submit_state_backoff_multiple: 2.0,
            submit_state_backoff_jitter_multiple: 0.0,
        },
        ..HandlerConfig::default()
    }
}

/// Recording control-plane fake.
///
/// Records every submission in arrival order, replays scripted
/// responses (default `Ok`), and can hold submissions open on a gate to
/// observe in-flight concurrency.
#[derive(Default)]
pub struct RecordingControlPlane {
    pub task_calls: Mutex<Vec<TaskStateChange>>,
    pub container_calls: Mutex<Vec<ContainerStateChange>>,
    responses: Mutex<VecDeque<Result<(), ControlPlaneError>>>,
    hold: AtomicBool,
    release: Notify,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingControlPlane {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue responses for upcoming submissions; once exhausted every
    /// further submission succeeds.
    pub fn script(&self, responses: Vec<Result<(), ControlPlaneError>>) {
        *self.responses.lock().unwrap() = responses.into();
    }

    /// Block every submission inside the client until released.
    pub fn hold_submissions(&self) {
        self.hold.store(true, Ordering::Release);
    }

    pub fn release_submissions(&self) {
        self.hold.store(false, Ordering::Release);
        self.release.notify_waiters();
    }

    pub fn task_call_count(&self) -> usize {
        self.task_calls.lock().unwrap().len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::Acquire)
    }

    /// Statuses of recorded task submissions for one ARN, in order.
    pub fn task_statuses(&self, task_arn: &str) -> Vec<herald::domain::models::TaskStatus> {
        self.task_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|change| change.task_arn == task_arn)
            .map(|change| change.status)
            .collect()
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_in_flight.fetch_max(now, Ordering::AcqRel);

        loop {
            if !self.hold.load(Ordering::Acquire) {
                break;
            }
            let notified = self.release.notified();
            if !self.hold.load(Ordering::Acquire) {
                break;
            }
            notified.await;
        }
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    fn next_response(&self) -> Result<(), ControlPlaneError> {
        self.responses.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[async_trait]
impl ControlPlaneClient for RecordingControlPlane {
    async fn submit_task_state_change(
        &self,
        change: TaskStateChange,
    ) -> Result<(), ControlPlaneError> {
        self.enter().await;
        self.task_calls.lock().unwrap().push(change);
        let result = self.next_response();
        self.exit();
        result
    }

    async fn submit_container_state_change(
        &self,
        change: ContainerStateChange,
    ) -> Result<(), ControlPlaneError> {
        self.enter().await;
        self.container_calls.lock().unwrap().push(change);
        let result = self.next_response();
        self.exit();
        result
    }
}

/// Recording sent-status store. Counts saves per entity kind.
#[derive(Default)]
pub struct RecordingSentStatus {
    pub task_saves: Mutex<Vec<String>>,
    pub container_saves: Mutex<Vec<String>>,
    pub agent_saves: Mutex<Vec<String>>,
    pub attachment_saves: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingSentStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn task_save_count(&self) -> usize {
        self.task_saves.lock().unwrap().len()
    }
}

#[async_trait]
impl SentStatusRepository for RecordingSentStatus {
    async fn save_task(&self, task: &Task) -> Result<(), SentStatusError> {
        self.task_saves.lock().unwrap().push(task.arn.clone());
        Ok(())
    }

    async fn save_container(&self, container: &Container) -> Result<(), SentStatusError> {
        self.container_saves.lock().unwrap().push(container.name.clone());
        Ok(())
    }

    async fn save_managed_agent(&self, agent: &ManagedAgent) -> Result<(), SentStatusError> {
        self.agent_saves.lock().unwrap().push(agent.name.clone());
        Ok(())
    }

    async fn save_attachment(&self, attachment: &Attachment) -> Result<(), SentStatusError> {
        self.attachment_saves.lock().unwrap().push(attachment.arn.clone());
        Ok(())
    }
}

/// In-memory task engine state.
#[derive(Default)]
pub struct FakeTaskEngine {
    tasks: Mutex<std::collections::HashMap<String, Arc<Task>>>,
}

#[allow(dead_code)]
impl FakeTaskEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, task: Arc<Task>) {
        self.tasks.lock().unwrap().insert(task.arn.clone(), task);
    }
}

impl TaskEngineState for FakeTaskEngine {
    fn task_by_arn(&self, arn: &str) -> Option<Arc<Task>> {
        self.tasks.lock().unwrap().get(arn).cloned()
    }
}

/// Everything a handler test needs, wired together.
#[allow(dead_code)]
pub struct TestHarness {
    pub handler: TaskEventHandler,
    pub client: Arc<RecordingControlPlane>,
    pub sent_status: Arc<RecordingSentStatus>,
    pub engine: Arc<FakeTaskEngine>,
    pub cancel: CancellationToken,
}

#[allow(dead_code)]
impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(fast_handler_config())
    }

    pub fn with_config(config: HandlerConfig) -> Self {
        let client = RecordingControlPlane::new();
        let sent_status = RecordingSentStatus::new();
        let engine = FakeTaskEngine::new();
        let cancel = CancellationToken::new();
        let handler = TaskEventHandler::new(
            config,
            client.clone(),
            sent_status.clone(),
            engine.clone(),
            cancel.clone(),
        );
        Self {
            handler,
            client,
            sent_status,
            engine,
            cancel,
        }
    }

    /// Wait until every per-task queue has drained and been removed.
    pub async fn wait_until_drained(&self, timeout_ms: u64) -> bool {
        let handler = self.handler.clone();
        wait_for(
            move || {
                let handler = handler.clone();
                async move { handler.stats().await.active_task_queues == 0 }
            },
            timeout_ms,
        )
        .await
    }
}
