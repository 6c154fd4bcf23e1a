//! Observable scheduler events and the sinks that consume them.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use cadence_core::time::format_time;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::task::TaskId;

/// One observable occurrence in the scheduler's life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum SchedulerEvent {
    TaskRegistered { id: TaskId },
    TaskReady { id: TaskId, at: DateTime<Utc> },
    TaskExecuting { id: TaskId, at: DateTime<Utc> },
    TaskCompletedOnTime { id: TaskId, at: DateTime<Utc> },
    TaskDeadlineMissed { id: TaskId, at: DateTime<Utc> },
    SchedulerStarted { at: DateTime<Utc> },
    SchedulerStopped { at: DateTime<Utc> },
}

impl SchedulerEvent {
    /// Task the event refers to, if any.
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Self::TaskRegistered { id }
            | Self::TaskReady { id, .. }
            | Self::TaskExecuting { id, .. }
            | Self::TaskCompletedOnTime { id, .. }
            | Self::TaskDeadlineMissed { id, .. } => Some(*id),
            Self::SchedulerStarted { .. } | Self::SchedulerStopped { .. } => None,
        }
    }
}

/// Receives scheduler events.
///
/// Sinks may be called while the scheduler's internal lock is held and must
/// not call back into the scheduler.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SchedulerEvent);
}

/// Reports events as structured `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SchedulerEvent) {
        match event {
            SchedulerEvent::TaskRegistered { id } => info!(task_id = id, "task registered"),
            SchedulerEvent::TaskReady { id, at } => {
                debug!(task_id = id, at = %format_time(*at), "task ready")
            }
            SchedulerEvent::TaskExecuting { id, at } => {
                debug!(task_id = id, at = %format_time(*at), "task executing")
            }
            SchedulerEvent::TaskCompletedOnTime { id, at } => {
                debug!(task_id = id, at = %format_time(*at), "task completed")
            }
            SchedulerEvent::TaskDeadlineMissed { id, at } => {
                warn!(task_id = id, at = %format_time(*at), "task missed deadline")
            }
            SchedulerEvent::SchedulerStarted { at } => {
                info!(at = %format_time(*at), "scheduler started")
            }
            SchedulerEvent::SchedulerStopped { at } => {
                info!(at = %format_time(*at), "scheduler stopped")
            }
        }
    }
}

/// Writes one JSON object per event, newline-delimited.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&self, event: &SchedulerEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to serialize scheduler event");
                return;
            }
        };
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            warn!(error = %e, "failed to write scheduler event");
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SchedulerEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events recorded so far.
    pub fn events(&self) -> Vec<SchedulerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&SchedulerEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| pred(e))
            .count()
    }

    /// Task ids in the order they started executing.
    pub fn execution_order(&self) -> Vec<TaskId> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|e| match e {
                SchedulerEvent::TaskExecuting { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SchedulerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
