use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::scheduler::events::{EventSink, SchedulerEvent, TracingSink};
use crate::scheduler::metrics::SchedulerMetrics;
use crate::scheduler::registry::{TaskHandle, TaskRegistry, TaskSnapshot};
use crate::scheduler::selector::ReadyQueue;
use crate::scheduler::task::{Priority, RegistrationError, TaskDefinition, TaskId, TaskWork};
use crate::scheduler::types::{LoopPhase, SchedulerConfig};

/// Everything guarded by the scheduler's single lock.
pub(super) struct Inner {
    pub(super) registry: TaskRegistry,
    pub(super) ready: ReadyQueue,
    pub(super) phase: LoopPhase,
    /// Set by registrations; cleared by the loop at the top of each scan.
    pub(super) wake_pending: bool,
    pub(super) metrics: SchedulerMetrics,
    pub(super) worker: Option<JoinHandle<()>>,
}

/// State shared between the control surface and the control thread.
pub(super) struct Shared {
    pub(super) config: SchedulerConfig,
    pub(super) inner: Mutex<Inner>,
    /// Wakes the loop (new task, shutdown) and `stop()` waiters.
    pub(super) signal: Condvar,
    pub(super) sink: Arc<dyn EventSink>,
}

impl Shared {
    pub(super) fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn emit(&self, event: SchedulerEvent) {
        self.sink.emit(&event);
    }
}

/// Single-server periodic task scheduler.
///
/// Tasks run one at a time on a dedicated control thread, earliest deadline
/// first with priority as the tie-break. All methods take `&self`, so the
/// scheduler can be shared across threads behind an `Arc`.
pub struct Scheduler {
    pub(super) shared: Arc<Shared>,
}

impl Scheduler {
    /// Create a stopped scheduler that reports events through `tracing`.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Create a stopped scheduler that reports events to `sink`.
    pub fn with_sink(config: SchedulerConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(Inner {
                    registry: TaskRegistry::new(),
                    ready: ReadyQueue::new(),
                    phase: LoopPhase::Stopped,
                    wake_pending: false,
                    metrics: SchedulerMetrics::default(),
                    worker: None,
                }),
                signal: Condvar::new(),
                sink,
            }),
        }
    }

    /// Register a periodic task. It becomes ready immediately.
    pub fn add_task<F>(
        &self,
        id: TaskId,
        priority: Priority,
        period: Duration,
        execution_cost: Duration,
        work: F,
    ) -> Result<TaskHandle, RegistrationError>
    where
        F: Fn(TaskId) + Send + Sync + 'static,
    {
        let def = TaskDefinition {
            id,
            priority,
            period,
            execution_cost,
        };
        self.register(def, Arc::new(work))
    }

    /// Register a task from a prepared definition and shared work.
    pub fn register(
        &self,
        def: TaskDefinition,
        work: TaskWork,
    ) -> Result<TaskHandle, RegistrationError> {
        let mut inner = self.shared.lock();
        let handle = inner.registry.register(def, work, Instant::now())?;
        inner.wake_pending = true;
        self.shared.emit(SchedulerEvent::TaskRegistered { id: def.id });
        drop(inner);
        self.shared.signal.notify_all();
        Ok(handle)
    }

    pub fn phase(&self) -> LoopPhase {
        self.shared.lock().phase
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Snapshot of every registered task, in registration order.
    pub fn tasks(&self) -> Vec<TaskSnapshot> {
        self.shared.lock().registry.snapshot()
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.shared.lock().metrics.clone()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
