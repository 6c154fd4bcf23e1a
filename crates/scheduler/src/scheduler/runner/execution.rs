use std::sync::{MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use cadence_core::time::{format_duration, wall_clock};
use tracing::{debug, error, trace};

use crate::scheduler::events::SchedulerEvent;
use crate::scheduler::selector::select_ready;
use crate::scheduler::task::{TaskId, TaskWork};
use crate::scheduler::types::LoopPhase;

use super::core::{Inner, Shared};

/// Marks the loop stopped if a task's work unwinds through it.
struct LoopGuard<'a> {
    shared: &'a Shared,
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("Task work panicked; scheduler loop terminated");
            self.shared.lock().phase = LoopPhase::Stopped;
            self.shared.signal.notify_all();
        }
    }
}

/// Body of the control thread. Returns once the phase leaves `Running`.
///
/// A panic raised by task work is not caught: it ends the thread.
pub(super) fn run_loop(shared: &Shared) {
    let _guard = LoopGuard { shared };
    let mut inner = shared.lock();

    while inner.phase == LoopPhase::Running {
        inner.wake_pending = false;
        let now = Instant::now();

        let Inner {
            registry,
            ready,
            metrics,
            ..
        } = &mut *inner;

        let detected = select_ready(registry, ready, now);
        if !detected.is_empty() {
            let at = wall_clock(now);
            for activation in &detected {
                metrics.record_activation(activation.id, activation.queued);
                trace!(
                    task_id = activation.id,
                    late = %format_duration(now.saturating_duration_since(activation.deadline)),
                    queued = activation.queued,
                    "activation detected"
                );
                shared.emit(SchedulerEvent::TaskReady {
                    id: activation.id,
                    at,
                });
            }
        }

        let Some(entry) = ready.pop_next(registry) else {
            inner = wait_for_work(shared, inner);
            continue;
        };
        let Some(task) = registry.get(entry.handle) else {
            continue;
        };
        let work = task.work.clone();
        let cost = task.def.execution_cost;
        trace!(task_id = entry.id, queued = ready.len(), "dispatching");

        // Run with the lock released so registrations are never blocked.
        drop(inner);
        let (busy, finished) = execute(shared, entry.id, &work, cost);
        inner = shared.lock();

        let missed = inner
            .registry
            .get(entry.handle)
            .is_some_and(|t| finished > t.next_deadline);
        inner.metrics.record_execution(entry.id, busy, missed);

        let at = wall_clock(finished);
        if missed {
            shared.emit(SchedulerEvent::TaskDeadlineMissed { id: entry.id, at });
        } else {
            shared.emit(SchedulerEvent::TaskCompletedOnTime { id: entry.id, at });
        }
    }

    debug!(phase = ?inner.phase, "scheduler loop exiting");
}

/// Invoke one task and simulate its execution cost.
/// Returns the busy time and the completion instant.
fn execute(shared: &Shared, id: TaskId, work: &TaskWork, cost: Duration) -> (Duration, Instant) {
    let started = Instant::now();
    shared.emit(SchedulerEvent::TaskExecuting {
        id,
        at: wall_clock(started),
    });

    work(id);
    if shared.config.simulate_execution_cost && !cost.is_zero() {
        thread::sleep(cost);
    }

    let finished = Instant::now();
    let busy = finished - started;
    trace!(task_id = id, busy = %format_duration(busy), "task finished");
    (busy, finished)
}

/// Sleep until the nearest deadline, a new registration or shutdown.
fn wait_for_work<'a>(shared: &'a Shared, inner: MutexGuard<'a, Inner>) -> MutexGuard<'a, Inner> {
    let idle = |s: &mut Inner| s.phase == LoopPhase::Running && !s.wake_pending;

    match inner.registry.earliest_deadline() {
        Some(deadline) => {
            let timeout = deadline.saturating_duration_since(Instant::now());
            shared
                .signal
                .wait_timeout_while(inner, timeout, idle)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0)
        }
        None => shared
            .signal
            .wait_while(inner, idle)
            .unwrap_or_else(PoisonError::into_inner),
    }
}
