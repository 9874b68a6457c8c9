//! Command line interface definition

use clap::Parser;
use seatring_types::ColorChoice;
use std::path::PathBuf;

/// seatring - run a table of workers sharing a ring of resources
#[derive(Parser)]
#[command(name = "seatring")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a table of workers sharing a ring of resources without deadlock")]
#[command(long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub table: TableArgs,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Table shape, overriding the config file and environment
#[derive(Parser)]
pub struct TableArgs {
    /// Number of workers (and resources) on the ring
    #[arg(short = 'n', long, value_name = "N")]
    pub size: Option<usize>,

    /// Work cycles each worker performs
    #[arg(short, long, value_name = "C")]
    pub cycles: Option<u32>,

    /// Milliseconds spent on each unit of work (0 yields instead)
    #[arg(long, value_name = "MS")]
    pub work_ms: Option<u64>,
}

/// Output and configuration flags
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Only print the summary
    #[arg(short, long, conflicts_with = "json")]
    pub quiet: bool,

    /// Enable debug logging and seat transitions in the output
    #[arg(long)]
    pub debug: bool,

    /// Color output control
    #[arg(long, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
