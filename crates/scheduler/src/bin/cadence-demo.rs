//! cadence-demo: runs a handful of periodic tasks on the scheduler.
//!
//! Defaults mirror a small control system: a sensor read every second, a
//! control loop every two seconds and a fast, high-priority sensor every
//! 500ms. Override with repeated `--task id:priority:period_ms:cost_ms`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use cadence_core::time::{format_duration, format_time};
use cadence_scheduler::{
    EventSink, JsonLinesSink, Scheduler, SchedulerConfig, TaskDefinition, TaskId, TaskWork,
    TracingSink,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Periodic task scheduler demo.
#[derive(Parser, Debug)]
#[command(name = "cadence-demo", version, about)]
struct Cli {
    /// How long to run before stopping, in seconds.
    #[arg(long, env = "CADENCE_RUN_SECS", default_value_t = 10)]
    run_secs: u64,

    /// Task as `id:priority:period_ms:cost_ms`. Repeatable.
    #[arg(long = "task", value_name = "TASK", default_values_t = default_tasks())]
    tasks: Vec<TaskDefinition>,

    /// Emit events as JSON lines on stdout instead of log records.
    #[arg(long)]
    json_events: bool,
}

fn default_tasks() -> Vec<TaskDefinition> {
    ["1:2:1000:200", "2:1:2000:300", "3:3:500:100"]
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

// ── Sample work ─────────────────────────────────────────────────────

fn sensor_reading(id: TaskId) {
    info!(task_id = id, at = %format_time(chrono::Utc::now()), "reading sensor data");
}

fn control_loop(id: TaskId) {
    info!(task_id = id, at = %format_time(chrono::Utc::now()), "executing control loop");
}

fn work_for(id: TaskId) -> TaskWork {
    if id % 2 == 0 {
        Arc::new(control_loop)
    } else {
        Arc::new(sensor_reading)
    }
}

// ── Main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    cadence_core::load_dotenv();
    let cli = Cli::parse();
    let config = SchedulerConfig::from_env();

    let sink: Arc<dyn EventSink> = if cli.json_events {
        Arc::new(JsonLinesSink::new(std::io::stdout()))
    } else {
        Arc::new(TracingSink)
    };
    let scheduler = Scheduler::with_sink(config, sink);

    for def in &cli.tasks {
        scheduler.register(*def, work_for(def.id))?;
        info!(
            task_id = def.id,
            priority = def.priority,
            period = %format_duration(def.period),
            cost = %format_duration(def.execution_cost),
            "added task"
        );
    }

    scheduler.start()?;
    thread::sleep(Duration::from_secs(cli.run_secs));
    scheduler.stop();

    let metrics = scheduler.metrics();
    for def in &cli.tasks {
        info!(
            task_id = def.id,
            executions = metrics.executions.get(&def.id).copied().unwrap_or(0),
            misses = metrics.deadline_misses.get(&def.id).copied().unwrap_or(0),
            skipped = metrics.skipped_activations.get(&def.id).copied().unwrap_or(0),
            "task summary"
        );
    }

    Ok(())
}
