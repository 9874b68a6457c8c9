//! Defaults and environment variable names

/// Number of workers and resources on the ring
pub const DEFAULT_TABLE_SIZE: usize = 5;

/// Work cycles each worker performs before it is done
pub const DEFAULT_CYCLES_PER_WORKER: u32 = 5;

/// Smallest ring that can be arbitrated
pub const MIN_TABLE_SIZE: usize = 2;

pub const ENV_SIZE: &str = "SEATRING_SIZE";
pub const ENV_CYCLES: &str = "SEATRING_CYCLES";
pub const ENV_WORK_MS: &str = "SEATRING_WORK_MS";
pub const ENV_OUTPUT: &str = "SEATRING_OUTPUT";
pub const ENV_COLOR: &str = "SEATRING_COLOR";
