use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Table run lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// All workers are about to be spawned
    Started {
        run_id: String,
        size: usize,
        cycles_per_worker: u32,
    },

    /// Every worker reached `Done` and the arbiter is back to its initial state
    Completed {
        run_id: String,
        total_work_units: u64,
        duration: Duration,
    },

    /// The run was cancelled before all workers finished
    Cancelled { run_id: String },

    /// The run failed
    Failed {
        run_id: String,
        failure: super::FailureContext,
    },
}
