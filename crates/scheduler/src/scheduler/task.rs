use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Caller-assigned task identifier.
pub type TaskId = u64;

/// Static task priority. Higher numeric value = more urgent.
pub type Priority = i32;

/// Work invoked once per dispatched activation, with the owning task's id.
pub type TaskWork = Arc<dyn Fn(TaskId) + Send + Sync>;

/// Error returned synchronously by task registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Task {0} is already registered")]
    DuplicateId(TaskId),
    #[error("Task {id}: period must be positive")]
    NonPositivePeriod { id: TaskId },
    #[error("Task {id}: period is too large to schedule")]
    PeriodOutOfRange { id: TaskId },
    #[error("Task {id}: execution cost must not be negative")]
    NegativeExecutionCost { id: TaskId },
    #[error("Invalid task definition '{input}': {reason}")]
    InvalidDefinition { input: String, reason: String },
}

/// Error type for scheduler lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("Failed to spawn scheduler thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Static parameters of a periodic task, without its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDefinition {
    pub id: TaskId,
    pub priority: Priority,
    pub period: Duration,
    pub execution_cost: Duration,
}

impl TaskDefinition {
    /// Build a definition from signed millisecond values, rejecting
    /// non-positive periods and negative costs.
    pub fn from_millis(
        id: TaskId,
        priority: Priority,
        period_ms: i64,
        cost_ms: i64,
    ) -> Result<Self, RegistrationError> {
        if period_ms <= 0 {
            return Err(RegistrationError::NonPositivePeriod { id });
        }
        if cost_ms < 0 {
            return Err(RegistrationError::NegativeExecutionCost { id });
        }
        Ok(Self {
            id,
            priority,
            period: Duration::from_millis(period_ms as u64),
            execution_cost: Duration::from_millis(cost_ms as u64),
        })
    }

    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.period.is_zero() {
            return Err(RegistrationError::NonPositivePeriod { id: self.id });
        }
        Ok(())
    }
}

/// Parses `id:priority:period_ms:cost_ms`, e.g. `3:3:500:100`.
impl FromStr for TaskDefinition {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RegistrationError::InvalidDefinition {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(invalid("expected id:priority:period_ms:cost_ms"));
        }

        let id: TaskId = parts[0].parse().map_err(|_| invalid("bad id"))?;
        let priority: Priority = parts[1].parse().map_err(|_| invalid("bad priority"))?;
        let period_ms: i64 = parts[2].parse().map_err(|_| invalid("bad period"))?;
        let cost_ms: i64 = parts[3].parse().map_err(|_| invalid("bad execution cost"))?;

        Self::from_millis(id, priority, period_ms, cost_ms)
    }
}

impl fmt::Display for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.id,
            self.priority,
            self.period.as_millis(),
            self.execution_cost.as_millis()
        )
    }
}

/// A registered periodic task plus its scheduling bookkeeping.
pub(crate) struct Task {
    pub(crate) def: TaskDefinition,
    pub(crate) work: TaskWork,
    /// Baseline the deadline sequence is counted from.
    pub(crate) registered_at: Instant,
    pub(crate) next_deadline: Instant,
    /// Number of detected activations so far.
    pub(crate) activations: u64,
    /// An activation is queued and has not been dispatched yet.
    pub(crate) pending: bool,
    /// The next deadline is not representable; the task never activates again.
    pub(crate) exhausted: bool,
}

impl Task {
    pub(crate) fn new(def: TaskDefinition, work: TaskWork, now: Instant) -> Self {
        Self {
            def,
            work,
            registered_at: now,
            next_deadline: now,
            activations: 0,
            pending: false,
            exhausted: false,
        }
    }

    /// Record one activation and move the deadline forward by exactly one
    /// period. Returns the deadline the activation was detected at, or `None`
    /// (marking the task exhausted) when the following deadline would
    /// overflow `Instant`.
    pub(crate) fn advance(&mut self) -> Option<Instant> {
        let Some(next) = self.next_deadline.checked_add(self.def.period) else {
            self.exhausted = true;
            return None;
        };
        let activated_at = self.next_deadline;
        self.next_deadline = next;
        self.activations += 1;
        Some(activated_at)
    }

    /// Move the baseline of a never-activated task forward to `at`.
    pub(crate) fn rebase(&mut self, at: Instant) {
        if self.activations == 0 && self.registered_at < at {
            self.registered_at = at;
            self.next_deadline = at;
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("def", &self.def)
            .field("next_deadline", &self.next_deadline)
            .field("activations", &self.activations)
            .field("pending", &self.pending)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> TaskWork {
        Arc::new(|_: TaskId| {})
    }

    #[test]
    fn parse_definition() {
        let def: TaskDefinition = "3:3:500:100".parse().unwrap();
        assert_eq!(def.id, 3);
        assert_eq!(def.priority, 3);
        assert_eq!(def.period, Duration::from_millis(500));
        assert_eq!(def.execution_cost, Duration::from_millis(100));
        assert_eq!(def.to_string(), "3:3:500:100");
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(matches!(
            "1:2:3".parse::<TaskDefinition>(),
            Err(RegistrationError::InvalidDefinition { .. })
        ));
        assert!(matches!(
            "x:2:3:4".parse::<TaskDefinition>(),
            Err(RegistrationError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn negative_values_rejected() {
        assert_eq!(
            TaskDefinition::from_millis(7, 1, 0, 10),
            Err(RegistrationError::NonPositivePeriod { id: 7 })
        );
        assert_eq!(
            TaskDefinition::from_millis(7, 1, -5, 10),
            Err(RegistrationError::NonPositivePeriod { id: 7 })
        );
        assert_eq!(
            "7:1:100:-1".parse::<TaskDefinition>(),
            Err(RegistrationError::NegativeExecutionCost { id: 7 })
        );
    }

    #[test]
    fn zero_cost_is_allowed() {
        let def = TaskDefinition::from_millis(1, 0, 10, 0).unwrap();
        assert!(def.execution_cost.is_zero());
        assert!(def.validate().is_ok());
    }

    #[test]
    fn advance_moves_one_period_per_activation() {
        let def = TaskDefinition::from_millis(1, 0, 100, 0).unwrap();
        let base = Instant::now();
        let mut task = Task::new(def, noop(), base);

        assert_eq!(task.advance(), Some(base));
        assert_eq!(task.advance(), Some(base + Duration::from_millis(100)));
        assert_eq!(task.next_deadline, base + Duration::from_millis(200));
        assert_eq!(task.activations, 2);
    }

    #[test]
    fn rebase_only_touches_unactivated_tasks() {
        let def = TaskDefinition::from_millis(1, 0, 100, 0).unwrap();
        let base = Instant::now();
        let later = base + Duration::from_millis(50);

        let mut fresh = Task::new(def, noop(), base);
        fresh.rebase(later);
        assert_eq!(fresh.next_deadline, later);

        let mut active = Task::new(def, noop(), base);
        active.advance();
        active.rebase(later);
        assert_eq!(active.next_deadline, base + Duration::from_millis(100));
    }

    #[test]
    fn advance_stops_at_unrepresentable_deadline() {
        let base = Instant::now();
        // Largest power-of-two period with `base + period` representable but
        // `base + 2 * period` not.
        let mut period = Duration::from_secs(1);
        while let Some(next) = period
            .checked_mul(2)
            .filter(|p| base.checked_add(*p).is_some())
        {
            period = next;
        }
        let def = TaskDefinition {
            id: 1,
            priority: 0,
            period,
            execution_cost: Duration::ZERO,
        };
        let mut task = Task::new(def, noop(), base);

        assert_eq!(task.advance(), Some(base));
        assert!(!task.exhausted);
        assert_eq!(task.advance(), None);
        assert!(task.exhausted);
        assert_eq!(task.activations, 1);
        assert_eq!(task.next_deadline, base + period);
    }
}
