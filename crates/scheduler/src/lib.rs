pub mod scheduler;

pub use scheduler::{
    EventSink, JsonLinesSink, LoopPhase, Priority, RecordingSink, RegistrationError, Scheduler,
    SchedulerConfig, SchedulerError, SchedulerEvent, SchedulerMetrics, TaskDefinition, TaskHandle,
    TaskId, TaskSnapshot, TaskWork, TracingSink,
};
