use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::task::TaskId;

/// Per-task scheduling counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Detected activations by task id.
    pub activations: HashMap<TaskId, u64>,
    /// Activations detected while a previous one was still queued.
    pub skipped_activations: HashMap<TaskId, u64>,
    /// Dispatched executions by task id.
    pub executions: HashMap<TaskId, u64>,
    /// Executions that finished by their deadline.
    pub completed_on_time: HashMap<TaskId, u64>,
    /// Executions that finished after their deadline.
    pub deadline_misses: HashMap<TaskId, u64>,
    /// Mean busy time (work plus simulated cost) per execution.
    pub avg_busy_duration: HashMap<TaskId, Duration>,
    /// Wall-clock time of the last completed execution.
    pub last_completed: HashMap<TaskId, DateTime<Utc>>,
}

impl SchedulerMetrics {
    pub fn record_activation(&mut self, id: TaskId, queued: bool) {
        *self.activations.entry(id).or_default() += 1;
        if !queued {
            *self.skipped_activations.entry(id).or_default() += 1;
        }
    }

    /// Record a finished execution.
    pub fn record_execution(&mut self, id: TaskId, busy: Duration, missed: bool) {
        let count = {
            let c = self.executions.entry(id).or_default();
            *c += 1;
            *c
        };
        if missed {
            *self.deadline_misses.entry(id).or_default() += 1;
        } else {
            *self.completed_on_time.entry(id).or_default() += 1;
        }
        self.last_completed.insert(id, Utc::now());

        // Incremental mean: new_avg = prev_avg + (busy - prev_avg) / count
        let new_avg = if count == 1 {
            busy
        } else {
            let prev = self.avg_busy_duration.get(&id).copied().unwrap_or_default();
            let prev_nanos = prev.as_nanos() as f64;
            let cur_nanos = busy.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
        self.avg_busy_duration.insert(id, new_avg);
    }

    /// Total deadline misses across all tasks.
    pub fn total_misses(&self) -> u64 {
        self.deadline_misses.values().sum()
    }
}
