// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Manager
//!
//! Bounded FIFO queue + fixed worker pool + handler dispatch table + task
//! state table.
//!
//! ## Concurrency
//!
//! - Admission is a `tokio::sync::Semaphore` with `max_queue_size` permits,
//!   one per `pending` task. Producers use `try_acquire`, so
//!   [`TaskManager::create_task`] never waits: a full queue is reported as
//!   [`TaskError::QueueFull`]. The permit is returned as soon as the task
//!   leaves `pending` (claimed by a worker, cancelled, or drained by `stop`).
//! - The queue itself is an unbounded `tokio::sync::mpsc` channel of
//!   [`TaskId`]s; a cancelled id stays in it until a worker skips it, but no
//!   longer counts against admission.
//! - `max_workers` tokio tasks share the receiver behind an async mutex and
//!   observe a [`CancellationToken`] at every dequeue. Handlers are never
//!   interrupted mid-flight.
//! - Task records live in a `DashMap`. Every status change is a
//!   compare-and-set under the entry lock, so a worker's terminal write is
//!   dropped if the task was cancelled while its handler ran.
//!
//! ## Failure isolation
//!
//! Handler errors and panics are converted into the task's `failed` state at
//! the worker boundary; the worker keeps serving the queue.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::events::TaskEvent;
use crate::domain::handler::TaskHandler;
use crate::domain::node_config::TaskManagerConfig;
use crate::domain::task::{Task, TaskError, TaskId, TaskParams, TaskStatus};
use crate::infrastructure::event_bus::EventBus;

const STOPPED_REASON: &str = "task manager stopped";

/// State shared between the manager facade and its workers.
struct Shared {
    tasks: DashMap<TaskId, Task>,
    handlers: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
    event_bus: Arc<EventBus>,
    /// One permit per free slot in the pending queue.
    admission: Semaphore,
    /// Notified whenever a task reaches a terminal state.
    settled: Notify,
}

struct WorkerPool {
    token: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<TaskId>>>,
}

pub struct TaskManager {
    config: TaskManagerConfig,
    shared: Arc<Shared>,
    sender: RwLock<Option<mpsc::UnboundedSender<TaskId>>>,
    pool: AsyncMutex<Option<WorkerPool>>,
}

impl TaskManager {
    /// Zero `max_workers` or `max_queue_size` is raised to 1 (with a warning);
    /// [`TaskManager::config`] reports the limits actually in force.
    pub fn new(mut config: TaskManagerConfig, event_bus: Arc<EventBus>) -> Self {
        if config.max_workers == 0 || config.max_queue_size == 0 {
            warn!(
                max_workers = config.max_workers,
                max_queue_size = config.max_queue_size,
                "Task manager limits must be positive; raising zero values to 1"
            );
            config.max_workers = config.max_workers.max(1);
            config.max_queue_size = config.max_queue_size.max(1);
        }

        Self {
            shared: Arc::new(Shared {
                tasks: DashMap::new(),
                handlers: RwLock::new(HashMap::new()),
                event_bus,
                admission: Semaphore::new(config.max_queue_size),
                settled: Notify::new(),
            }),
            config,
            sender: RwLock::new(None),
            pool: AsyncMutex::new(None),
        }
    }

    pub fn config(&self) -> &TaskManagerConfig {
        &self.config
    }

    /// Spawn the worker pool and open the queue for admission.
    pub async fn start(&self) -> Result<(), TaskError> {
        let mut pool = self.pool.lock().await;
        if pool.is_some() {
            return Err(TaskError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let receiver = Arc::new(AsyncMutex::new(rx));
        let token = CancellationToken::new();
        let worker_count = self.config.max_workers;

        let workers = (0..worker_count)
            .map(|worker_id| {
                let shared = Arc::clone(&self.shared);
                let receiver = Arc::clone(&receiver);
                let token = token.clone();
                tokio::spawn(async move { worker_loop(worker_id, shared, receiver, token).await })
            })
            .collect();

        *self.sender.write() = Some(tx);
        *pool = Some(WorkerPool {
            token,
            workers,
            receiver,
        });

        info!(
            workers = worker_count,
            queue_capacity = self.config.max_queue_size,
            "Task manager started"
        );
        Ok(())
    }

    /// Close admission, cancel the workers and wait for every one of them to
    /// exit. Tasks still queued are marked `cancelled`.
    pub async fn stop(&self) -> Result<(), TaskError> {
        // Held until the queue is drained so a concurrent start() cannot interleave.
        let mut guard = self.pool.lock().await;
        let Some(pool) = guard.take() else {
            return Err(TaskError::NotRunning);
        };

        // Dropping the sender under the write lock fences out in-flight create_task calls.
        self.sender.write().take();
        pool.token.cancel();

        for handle in pool.workers {
            if let Err(e) = handle.await {
                warn!("Task worker terminated abnormally: {}", e);
            }
        }

        let mut receiver = pool.receiver.lock().await;
        receiver.close();
        let mut abandoned = 0usize;
        while let Ok(task_id) = receiver.try_recv() {
            if self.shared.cancel(task_id, Some(STOPPED_REASON.to_string())).is_ok() {
                abandoned += 1;
            }
        }

        info!(abandoned, "Task manager stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.sender.read().is_some()
    }

    /// Number of `pending` tasks holding an admission slot.
    pub fn queue_depth(&self) -> usize {
        self.config
            .max_queue_size
            .saturating_sub(self.shared.admission.available_permits())
    }

    /// Install (or replace) the handler for `task_type`.
    pub fn register_task_handler(&self, task_type: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        let task_type = task_type.into();
        if self
            .shared
            .handlers
            .write()
            .insert(task_type.clone(), handler)
            .is_some()
        {
            info!(task_type = %task_type, "Replaced task handler");
        } else {
            debug!(task_type = %task_type, "Registered task handler");
        }
    }

    pub fn unregister_task_handler(&self, task_type: &str) -> bool {
        let removed = self.shared.handlers.write().remove(task_type).is_some();
        if removed {
            debug!(task_type = %task_type, "Unregistered task handler");
        }
        removed
    }

    pub fn handler_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.shared.handlers.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// Record a new `pending` task and enqueue it.
    ///
    /// Fails fast when the manager is stopped, the type has no handler, or the
    /// queue is at capacity.
    pub fn create_task(&self, task_type: &str, params: TaskParams) -> Result<TaskId, TaskError> {
        let sender = self.sender.read();
        let Some(tx) = sender.as_ref() else {
            reject("not_running");
            return Err(TaskError::NotRunning);
        };

        if !self.shared.handlers.read().contains_key(task_type) {
            reject("unknown_type");
            return Err(TaskError::UnknownTaskType(task_type.to_string()));
        }

        match self.shared.admission.try_acquire() {
            Ok(permit) => permit.forget(),
            Err(TryAcquireError::NoPermits) => {
                reject("queue_full");
                return Err(TaskError::QueueFull(self.config.max_queue_size));
            }
            Err(TryAcquireError::Closed) => {
                reject("not_running");
                return Err(TaskError::NotRunning);
            }
        }
        metrics::gauge!("hive_task_queue_depth").increment(1.0);

        let task = Task::new(task_type, params);
        let task_id = task.id;
        let created_at = task.created_at;
        self.shared.tasks.insert(task_id, task);

        // Published before the id becomes visible to workers.
        self.shared.event_bus.publish_task_event(TaskEvent::TaskCreated {
            task_id,
            task_type: task_type.to_string(),
            created_at,
        });
        if tx.send(task_id).is_err() {
            self.shared.tasks.remove(&task_id);
            self.shared.release_slot();
            reject("not_running");
            return Err(TaskError::NotRunning);
        }

        metrics::counter!("hive_tasks_created_total", "task_type" => task_type.to_string())
            .increment(1);
        debug!(task_id = %task_id, task_type = %task_type, "Task enqueued");
        Ok(task_id)
    }

    /// Mark a `pending` or `processing` task as `cancelled`.
    ///
    /// A handler already running is not interrupted; its result is discarded.
    pub fn cancel_task(&self, task_id: TaskId) -> Result<(), TaskError> {
        self.shared.cancel(task_id, None)
    }

    pub fn get_task(&self, task_id: TaskId) -> Option<Task> {
        self.shared.tasks.get(&task_id).map(|entry| entry.value().clone())
    }

    /// All tasks, oldest first, optionally filtered by status.
    pub fn get_tasks(&self, status: Option<TaskStatus>) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .shared
            .tasks
            .iter()
            .filter(|entry| status.map_or(true, |s| entry.status == s))
            .map(|entry| entry.value().clone())
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    /// Wait until the task reaches a terminal state and return it.
    pub async fn wait_for_task(&self, task_id: TaskId, timeout: Duration) -> Result<Task, TaskError> {
        let wait = async {
            loop {
                let notified = self.shared.settled.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                let Some(task) = self.get_task(task_id) else {
                    return Err(TaskError::TaskNotFound(task_id));
                };
                if task.status.is_terminal() {
                    return Ok(task);
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| TaskError::WaitTimedOut(task_id))?
    }

    /// Drop every terminal task from the table. Returns how many were removed.
    pub fn clear_finished_tasks(&self) -> usize {
        let before = self.shared.tasks.len();
        self.shared.tasks.retain(|_, task| !task.status.is_terminal());
        let removed = before.saturating_sub(self.shared.tasks.len());
        debug!(removed, "Cleared finished tasks");
        removed
    }
}

fn reject(reason: &'static str) {
    metrics::counter!("hive_tasks_rejected_total", "reason" => reason).increment(1);
}

impl Shared {
    fn release_slot(&self) {
        self.admission.add_permits(1);
        metrics::gauge!("hive_task_queue_depth").decrement(1.0);
    }

    fn cancel(&self, task_id: TaskId, reason: Option<String>) -> Result<(), TaskError> {
        let was_pending = {
            let mut entry = self
                .tasks
                .get_mut(&task_id)
                .ok_or(TaskError::TaskNotFound(task_id))?;
            let was_pending = entry.status == TaskStatus::Pending;
            entry.cancel(reason)?;
            was_pending
        };
        if was_pending {
            self.release_slot();
        }

        info!(task_id = %task_id, "Task cancelled");
        metrics::counter!("hive_tasks_cancelled_total").increment(1);
        self.event_bus.publish_task_event(TaskEvent::TaskCancelled {
            task_id,
            cancelled_at: Utc::now(),
        });
        self.settled.notify_waiters();
        Ok(())
    }

    /// Claim a dequeued task (`pending -> processing`) and return a snapshot.
    fn claim(&self, task_id: TaskId) -> Option<Task> {
        let mut entry = self.tasks.get_mut(&task_id)?;
        if entry.status != TaskStatus::Pending {
            debug!(task_id = %task_id, status = %entry.status, "Skipping task that is no longer pending");
            return None;
        }
        if let Err(e) = entry.transition_to(TaskStatus::Processing) {
            warn!(task_id = %task_id, "Could not claim task: {}", e);
            return None;
        }
        let task = entry.value().clone();
        drop(entry);
        self.release_slot();
        Some(task)
    }

    async fn process(&self, task_id: TaskId) {
        let Some(task) = self.claim(task_id) else {
            return;
        };

        self.event_bus.publish_task_event(TaskEvent::TaskStarted {
            task_id,
            started_at: task.updated_at,
        });

        let handler = self.handlers.read().get(&task.task_type).cloned();
        let outcome = match handler {
            None => Err(format!(
                "No handler registered for task type '{}'",
                task.task_type
            )),
            Some(handler) => match AssertUnwindSafe(handler.handle(&task)).catch_unwind().await {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(e.to_string()),
                Err(panic) => Err(format!("Handler panicked: {}", panic_message(panic.as_ref()))),
            },
        };

        self.settle(&task, outcome);
    }

    /// Terminal write, fenced on the task still being `processing`.
    fn settle(&self, task: &Task, outcome: Result<TaskParams, String>) {
        let task_id = task.id;
        let event = {
            let Some(mut entry) = self.tasks.get_mut(&task_id) else {
                return;
            };
            if entry.status != TaskStatus::Processing {
                debug!(
                    task_id = %task_id,
                    status = %entry.status,
                    "Discarding handler outcome for task that left processing"
                );
                return;
            }

            match outcome {
                Ok(result) => {
                    if let Err(e) = entry.complete(result) {
                        warn!(task_id = %task_id, "Could not complete task: {}", e);
                        return;
                    }
                    metrics::counter!("hive_tasks_completed_total", "task_type" => task.task_type.clone())
                        .increment(1);
                    debug!(task_id = %task_id, "Task completed");
                    TaskEvent::TaskCompleted {
                        task_id,
                        completed_at: entry.updated_at,
                    }
                }
                Err(error) => {
                    warn!(task_id = %task_id, task_type = %task.task_type, "Task failed: {}", error);
                    if let Err(e) = entry.fail(error.clone()) {
                        warn!(task_id = %task_id, "Could not fail task: {}", e);
                        return;
                    }
                    metrics::counter!("hive_tasks_failed_total", "task_type" => task.task_type.clone())
                        .increment(1);
                    TaskEvent::TaskFailed {
                        task_id,
                        error,
                        failed_at: entry.updated_at,
                    }
                }
            }
        };

        self.event_bus.publish_task_event(event);
        self.settled.notify_waiters();
    }
}

async fn worker_loop(
    worker_id: usize,
    shared: Arc<Shared>,
    receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<TaskId>>>,
    token: CancellationToken,
) {
    debug!(worker_id, "Task worker started");

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = async { receiver.lock().await.recv().await } => next,
        };

        let Some(task_id) = next else {
            break;
        };
        shared.process(task_id).await;
    }

    debug!(worker_id, "Task worker stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::handler::handler_fn;
    use serde_json::json;

    fn params(value: serde_json::Value) -> TaskParams {
        value.as_object().cloned().unwrap()
    }

    fn manager(max_workers: usize, max_queue_size: usize) -> TaskManager {
        TaskManager::new(
            TaskManagerConfig {
                max_workers,
                max_queue_size,
            },
            Arc::new(EventBus::new(256)),
        )
    }

    #[tokio::test]
    async fn test_create_task_requires_running_manager() {
        let manager = manager(1, 4);
        manager.register_task_handler("echo", handler_fn(|t: &Task| Ok(t.params.clone())));
        assert_eq!(
            manager.create_task("echo", TaskParams::new()).unwrap_err(),
            TaskError::NotRunning
        );
    }

    #[tokio::test]
    async fn test_create_task_rejects_unknown_type() {
        let manager = manager(1, 4);
        manager.start().await.unwrap();
        assert_eq!(
            manager.create_task("nope", TaskParams::new()).unwrap_err(),
            TaskError::UnknownTaskType("nope".to_string())
        );
        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_twice_fails_and_restart_works() {
        let manager = manager(2, 4);
        manager.register_task_handler("echo", handler_fn(|t: &Task| Ok(t.params.clone())));
        manager.start().await.unwrap();
        assert_eq!(manager.start().await.unwrap_err(), TaskError::AlreadyRunning);
        manager.stop().await.unwrap();
        assert!(!manager.is_running());
        assert_eq!(manager.stop().await.unwrap_err(), TaskError::NotRunning);

        manager.start().await.unwrap();
        let id = manager.create_task("echo", params(json!({"x": 1}))).unwrap();
        let task = manager.wait_for_task(id, Duration::from_secs(5)).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_terminal_task_is_rejected() {
        let manager = manager(1, 4);
        manager.register_task_handler("echo", handler_fn(|t: &Task| Ok(t.params.clone())));
        manager.start().await.unwrap();
        let id = manager.create_task("echo", TaskParams::new()).unwrap();
        manager.wait_for_task(id, Duration::from_secs(5)).await.unwrap();

        assert!(matches!(
            manager.cancel_task(id),
            Err(TaskError::InvalidTransition { from: TaskStatus::Completed, .. })
        ));
        let missing = TaskId::new();
        assert_eq!(
            manager.cancel_task(missing).unwrap_err(),
            TaskError::TaskNotFound(missing)
        );
        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_finished_tasks() {
        let manager = manager(1, 4);
        manager.register_task_handler("echo", handler_fn(|t: &Task| Ok(t.params.clone())));
        manager.start().await.unwrap();
        let id = manager.create_task("echo", TaskParams::new()).unwrap();
        manager.wait_for_task(id, Duration::from_secs(5)).await.unwrap();
        assert_eq!(manager.clear_finished_tasks(), 1);
        assert!(manager.get_task(id).is_none());
        manager.stop().await.unwrap();
    }

    #[test]
    fn test_zero_limits_are_raised_to_one() {
        let manager = manager(0, 0);
        assert_eq!(manager.config().max_workers, 1);
        assert_eq!(manager.config().max_queue_size, 1);
        assert_eq!(manager.queue_depth(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_stop_and_start_leave_manager_running() {
        let manager = manager(2, 4);
        manager.register_task_handler("echo", handler_fn(|t: &Task| Ok(t.params.clone())));
        manager.start().await.unwrap();

        // stop is polled first and holds the pool until it has finished.
        let (stopped, started) = tokio::join!(manager.stop(), manager.start());
        stopped.unwrap();
        started.unwrap();

        assert!(manager.is_running());
        let id = manager.create_task("echo", TaskParams::new()).unwrap();
        let task = manager.wait_for_task(id, Duration::from_secs(5)).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        manager.stop().await.unwrap();
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(boxed.as_ref()), "kaboom");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }
}
