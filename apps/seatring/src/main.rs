//! seatring - run a table of workers sharing a ring of resources
//!
//! This is the CLI application: it resolves the configuration, drives one
//! table run through the worker crate and renders its event stream.

mod cli;
mod display;
mod error;
mod events;

use crate::cli::Cli;
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use seatring_config::{Config, TableConfig};
use seatring_events::{AppEvent, EventEmitter, EventReceiver, EventSender, GeneralEvent};
use seatring_types::OutputFormat;
use seatring_worker::{run_table, RunReport};
use std::collections::HashMap;
use std::process;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        if e.is_cancelled() {
            warn!("Run interrupted");
        } else {
            error!("Application error: {}", e);
        }
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting seatring v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli);
    config.validate()?;

    let (event_sender, event_receiver) = seatring_events::channel();
    report_configuration(&event_sender, &cli, &config);

    let renderer = OutputRenderer::new(
        config.general.default_output,
        config.general.color,
        cli.global.quiet,
    );
    let mut event_handler = EventHandler::new(renderer.clone(), cli.global.debug);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling the run");
                cancel.cancel();
            }
        }
    });

    renderer.render_start(&config.table);
    let report = run_with_events(
        &config.table,
        event_sender,
        event_receiver,
        &mut event_handler,
        cancel,
    )
    .await?;

    renderer.render_report(&report)?;

    info!("Run completed successfully");
    Ok(())
}

/// Drive the table while rendering its events as they arrive
async fn run_with_events(
    table: &TableConfig,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
    cancel: CancellationToken,
) -> Result<RunReport, CliError> {
    let mut run_future = Box::pin(run_table(table, Some(event_sender), cancel));
    let mut channel_open = true;

    loop {
        select! {
            // Run finished
            result = &mut run_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result.map_err(CliError::from);
            }

            // Event received
            event = event_receiver.recv(), if channel_open => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => channel_open = false,
                }
            }
        }
    }
}

/// Apply CLI flags over file and environment configuration
fn apply_cli_config(config: &mut Config, cli: &Cli) {
    if let Some(color) = cli.global.color {
        config.general.color = color;
    }
    if cli.global.json {
        config.general.default_output = OutputFormat::Json;
    }

    if let Some(size) = cli.table.size {
        config.table.size = size;
    }
    if let Some(cycles) = cli.table.cycles {
        config.table.cycles_per_worker = cycles;
    }
    if let Some(work_ms) = cli.table.work_ms {
        config.table.work_duration_ms = work_ms;
    }
}

/// Emit the resolved configuration on the event stream
fn report_configuration(sender: &EventSender, cli: &Cli, config: &Config) {
    let source = cli.global.config.as_ref().map_or_else(
        || "defaults and environment".to_string(),
        |path| path.display().to_string(),
    );
    sender.emit(AppEvent::General(GeneralEvent::ConfigurationValidated { source }));

    if config.table.cycles_per_worker == 0 {
        sender.emit_warning(
            "cycles per worker is 0; workers will finish without working",
            "table.cycles_per_worker",
        );
    }

    sender.emit(AppEvent::General(GeneralEvent::debug_with_context(
        "table resolved",
        HashMap::from([
            ("size".to_string(), config.table.size.to_string()),
            (
                "cycles_per_worker".to_string(),
                config.table.cycles_per_worker.to_string(),
            ),
            (
                "work_duration_ms".to_string(),
                config.table.work_duration_ms.to_string(),
            ),
        ]),
    )));
}

/// Initialize tracing on stderr so stdout stays reserved for output
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "info,seatring=debug"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json_mode {
        builder.json().init();
    } else {
        builder.init();
    }
}
