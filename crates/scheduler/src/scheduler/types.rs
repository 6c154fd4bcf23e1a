use cadence_core::config::{env_or, env_parse};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of the scheduler loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopPhase {
    /// No control thread is running.
    Stopped,
    /// The control thread is scanning and dispatching.
    Running,
    /// `stop()` was requested; the loop exits after any in-flight execution.
    ShuttingDown,
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Name of the control thread.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    /// Sleep for each task's execution cost after its work returns.
    #[serde(default = "default_simulate_cost")]
    pub simulate_execution_cost: bool,
}

fn default_thread_name() -> String { "cadence-scheduler".to_string() }
fn default_simulate_cost() -> bool { true }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            simulate_execution_cost: default_simulate_cost(),
        }
    }
}

impl SchedulerConfig {
    /// Build config from `CADENCE_*` environment variables
    /// (call `cadence_core::load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            thread_name: env_or("CADENCE_THREAD_NAME", &default_thread_name()),
            simulate_execution_cost: env_parse("CADENCE_SIMULATE_COST", default_simulate_cost()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_config_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.thread_name, "cadence-scheduler");
        assert!(config.simulate_execution_cost);
    }

    #[test]
    fn scheduler_config_serde_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "simulate_execution_cost": false }"#).unwrap();
        assert_eq!(config.thread_name, "cadence-scheduler");
        assert!(!config.simulate_execution_cost);
    }
}
