//! Configuration sections

use crate::constants::{DEFAULT_CYCLES_PER_WORKER, DEFAULT_TABLE_SIZE};
use serde::{Deserialize, Serialize};
use seatring_types::{ColorChoice, OutputFormat};
use std::time::Duration;

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

/// Table configuration, fixed for the lifetime of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Number of resources, which is also the number of workers
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default = "default_cycles_per_worker")]
    pub cycles_per_worker: u32,
    /// Length of the notional unit of work; 0 only yields to the scheduler
    #[serde(default)]
    pub work_duration_ms: u64,
}

impl TableConfig {
    #[must_use]
    pub fn new(size: usize, cycles_per_worker: u32) -> Self {
        Self {
            size,
            cycles_per_worker,
            work_duration_ms: 0,
        }
    }

    #[must_use]
    pub fn with_work_duration(mut self, duration: Duration) -> Self {
        self.work_duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn work_duration(&self) -> Duration {
        Duration::from_millis(self.work_duration_ms)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_SIZE, DEFAULT_CYCLES_PER_WORKER)
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_size() -> usize {
    DEFAULT_TABLE_SIZE
}

fn default_cycles_per_worker() -> u32 {
    DEFAULT_CYCLES_PER_WORKER
}
