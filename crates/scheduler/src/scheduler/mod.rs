//! Single-server periodic task scheduler.
//!
//! Tasks are registered with a period, an execution cost and a static
//! priority. A dedicated control thread repeatedly detects activations,
//! dispatches the most urgent one (earliest deadline first, higher priority
//! on ties) and reports whether it finished before its next deadline.

pub mod events;
pub mod metrics;
pub mod registry;
pub mod runner;
pub(crate) mod selector;
pub mod task;
pub mod types;

pub use events::{EventSink, JsonLinesSink, RecordingSink, SchedulerEvent, TracingSink};
pub use metrics::SchedulerMetrics;
pub use registry::{TaskHandle, TaskSnapshot};
pub use runner::Scheduler;
pub use task::{Priority, RegistrationError, SchedulerError, TaskDefinition, TaskId, TaskWork};
pub use types::{LoopPhase, SchedulerConfig};
