use std::time::{Duration, Instant};

use indexmap::IndexMap;

use super::task::{Priority, RegistrationError, Task, TaskDefinition, TaskId, TaskWork};

/// Opaque, stable identity of a registered task.
///
/// Handles index an append-only map, so registering more tasks never
/// invalidates a handle held elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(usize);

/// Read-only view of a registered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub priority: Priority,
    pub period: Duration,
    pub execution_cost: Duration,
    pub registered_at: Instant,
    pub next_deadline: Instant,
    pub activations: u64,
    pub pending: bool,
}

/// Append-only store of registered tasks, keyed by id in insertion order.
#[derive(Debug, Default)]
pub(crate) struct TaskRegistry {
    tasks: IndexMap<TaskId, Task>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Validate and insert a task whose first deadline is `now`.
    /// On error the registry is left untouched.
    ///
    /// A period so large that `now + period` overflows `Instant` is rejected,
    /// since the task could never advance past its first activation.
    pub(crate) fn register(
        &mut self,
        def: TaskDefinition,
        work: TaskWork,
        now: Instant,
    ) -> Result<TaskHandle, RegistrationError> {
        def.validate()?;
        if now.checked_add(def.period).is_none() {
            return Err(RegistrationError::PeriodOutOfRange { id: def.id });
        }
        if self.tasks.contains_key(&def.id) {
            return Err(RegistrationError::DuplicateId(def.id));
        }
        let (index, _) = self.tasks.insert_full(def.id, Task::new(def, work, now));
        Ok(TaskHandle(index))
    }

    pub(crate) fn get(&self, handle: TaskHandle) -> Option<&Task> {
        self.tasks.get_index(handle.0).map(|(_, task)| task)
    }

    pub(crate) fn get_mut(&mut self, handle: TaskHandle) -> Option<&mut Task> {
        self.tasks.get_index_mut(handle.0).map(|(_, task)| task)
    }

    /// Iterate tasks mutably together with their handles, in registration order.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (TaskHandle, &mut Task)> {
        self.tasks
            .values_mut()
            .enumerate()
            .map(|(index, task)| (TaskHandle(index), task))
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Nearest upcoming deadline across all tasks that can still activate.
    pub(crate) fn earliest_deadline(&self) -> Option<Instant> {
        self.tasks
            .values()
            .filter(|t| !t.exhausted)
            .map(|t| t.next_deadline)
            .min()
    }

    /// Align never-activated tasks to a common start instant.
    pub(crate) fn rebase_unstarted(&mut self, at: Instant) {
        for task in self.tasks.values_mut() {
            task.rebase(at);
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<TaskSnapshot> {
        self.tasks
            .values()
            .map(|t| TaskSnapshot {
                id: t.def.id,
                priority: t.def.priority,
                period: t.def.period,
                execution_cost: t.def.execution_cost,
                registered_at: t.registered_at,
                next_deadline: t.next_deadline,
                activations: t.activations,
                pending: t.pending,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn def(id: TaskId, period_ms: i64) -> TaskDefinition {
        TaskDefinition::from_millis(id, 0, period_ms, 0).unwrap()
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = TaskRegistry::new();
        let now = Instant::now();
        let h = registry.register(def(1, 100), Arc::new(|_: TaskId| {}), now).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(h).unwrap().def.id, 1);
        assert_eq!(registry.get(h).unwrap().next_deadline, now);
    }

    #[test]
    fn duplicate_id_leaves_registry_unchanged() {
        let mut registry = TaskRegistry::new();
        let now = Instant::now();
        registry.register(def(1, 100), Arc::new(|_: TaskId| {}), now).unwrap();

        let err = registry
            .register(def(1, 999), Arc::new(|_: TaskId| {}), now)
            .unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateId(1));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot()[0].period, Duration::from_millis(100));
    }

    #[test]
    fn zero_period_rejected() {
        let mut registry = TaskRegistry::new();
        let bad = TaskDefinition {
            id: 4,
            priority: 0,
            period: Duration::ZERO,
            execution_cost: Duration::ZERO,
        };
        assert_eq!(
            registry.register(bad, Arc::new(|_: TaskId| {}), Instant::now()),
            Err(RegistrationError::NonPositivePeriod { id: 4 })
        );
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn unrepresentable_period_rejected() {
        let mut registry = TaskRegistry::new();
        let huge = TaskDefinition {
            id: 5,
            priority: 0,
            period: Duration::MAX,
            execution_cost: Duration::ZERO,
        };
        assert_eq!(
            registry.register(huge, Arc::new(|_: TaskId| {}), Instant::now()),
            Err(RegistrationError::PeriodOutOfRange { id: 5 })
        );
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.earliest_deadline(), None);
    }

    #[test]
    fn handles_survive_growth() {
        let mut registry = TaskRegistry::new();
        let now = Instant::now();
        let first = registry.register(def(10, 100), Arc::new(|_: TaskId| {}), now).unwrap();

        for id in 11..1_000 {
            registry.register(def(id, 100), Arc::new(|_: TaskId| {}), now).unwrap();
        }

        assert_eq!(registry.get(first).unwrap().def.id, 10);
        assert_eq!(registry.len(), 990);
    }

    #[test]
    fn earliest_deadline_is_minimum() {
        let mut registry = TaskRegistry::new();
        assert_eq!(registry.earliest_deadline(), None);

        let base = Instant::now();
        let a = registry.register(def(1, 300), Arc::new(|_: TaskId| {}), base).unwrap();
        let b = registry.register(def(2, 100), Arc::new(|_: TaskId| {}), base).unwrap();
        registry.get_mut(a).unwrap().advance().unwrap();
        registry.get_mut(b).unwrap().advance().unwrap();

        assert_eq!(
            registry.earliest_deadline(),
            Some(base + Duration::from_millis(100))
        );
    }
}
