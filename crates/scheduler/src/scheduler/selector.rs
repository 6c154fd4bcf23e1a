//! Readiness selection: detects activations and orders them by urgency.
//!
//! Urgency is earliest activation deadline first, then higher priority, then
//! the order in which activations were queued.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use tracing::warn;

use super::registry::{TaskHandle, TaskRegistry};
use super::task::{Priority, TaskId};

/// An activation detected during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Activation {
    pub(crate) id: TaskId,
    pub(crate) deadline: Instant,
    /// False when the task already had an undispatched activation queued.
    pub(crate) queued: bool,
}

/// A queued activation waiting to be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadyEntry {
    pub(crate) handle: TaskHandle,
    pub(crate) id: TaskId,
    pub(crate) deadline: Instant,
    pub(crate) priority: Priority,
    seq: u64,
}

impl Ord for ReadyEntry {
    // Max-heap: the greatest entry is the most urgent one.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Activations detected but not yet dispatched.
#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    heap: BinaryHeap<ReadyEntry>,
    next_seq: u64,
}

impl ReadyQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    fn push(&mut self, handle: TaskHandle, id: TaskId, deadline: Instant, priority: Priority) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ReadyEntry {
            handle,
            id,
            deadline,
            priority,
            seq,
        });
    }

    /// Remove the most urgent entry and clear its task's pending flag.
    pub(crate) fn pop_next(&mut self, registry: &mut TaskRegistry) -> Option<ReadyEntry> {
        let entry = self.heap.pop()?;
        if let Some(task) = registry.get_mut(entry.handle) {
            task.pending = false;
        }
        Some(entry)
    }
}

/// Detect every task whose deadline has been reached at `now`.
///
/// Each detected task has its deadline advanced by exactly one period. A task
/// that already has a queued activation is not queued again: the activation
/// is skipped rather than accumulated as backlog.
pub(crate) fn select_ready(
    registry: &mut TaskRegistry,
    ready: &mut ReadyQueue,
    now: Instant,
) -> Vec<Activation> {
    let mut detected = Vec::new();

    for (handle, task) in registry.iter_mut() {
        if task.exhausted || task.next_deadline > now {
            continue;
        }
        let Some(deadline) = task.advance() else {
            warn!(task_id = task.def.id, "next deadline overflows the clock, task retired");
            continue;
        };
        let queued = !task.pending;
        if queued {
            task.pending = true;
            ready.push(handle, task.def.id, deadline, task.def.priority);
        }
        detected.push(Activation {
            id: task.def.id,
            deadline,
            queued,
        });
    }

    detected
}
