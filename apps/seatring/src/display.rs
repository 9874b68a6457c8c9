//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use seatring_config::TableConfig;
use seatring_errors::Result;
use seatring_events::WorkerEvent;
use seatring_types::{ColorChoice, OutputFormat, WorkerPhase};
use seatring_worker::RunReport;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Output format
    format: OutputFormat,
    /// Color configuration
    color_choice: ColorChoice,
    /// Suppress everything but the summary
    quiet: bool,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(format: OutputFormat, color_choice: ColorChoice, quiet: bool) -> Self {
        Self {
            format,
            color_choice,
            quiet,
            term: Term::stdout(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Announce the table before any worker starts
    pub fn render_start(&self, table: &TableConfig) {
        if self.is_json() || self.quiet {
            return;
        }
        let line = format!(
            "Starting {} workers with {} cycles each.",
            table.size, table.cycles_per_worker
        );
        println!("{}", self.style_heading(&line));
    }

    /// Print one worker progress line
    pub fn render_progress(&self, event: &WorkerEvent, line: &str) {
        if !self.supports_color() {
            println!("{line}");
            return;
        }

        let style = match event {
            WorkerEvent::Working { .. } => Style::new().green(),
            WorkerEvent::PickedUp { .. } => Style::new().cyan(),
            WorkerEvent::Cancelled { .. } => Style::new().yellow(),
            _ => Style::new().dim(),
        };
        println!("{}", style.apply_to(line));
    }

    /// Print a warning or error to stderr
    pub fn render_problem(&self, label: &str, message: &str) {
        if self.supports_color() {
            eprintln!("{} {message}", Style::new().red().bold().apply_to(label));
        } else {
            eprintln!("{label} {message}");
        }
    }

    /// Render the final run report
    pub fn render_report(&self, report: &RunReport) -> Result<()> {
        match self.format {
            OutputFormat::Json => Self::render_json(report),
            OutputFormat::Plain => {
                Self::render_plain(report);
                Ok(())
            }
            OutputFormat::Tty => {
                self.render_table(report);
                Ok(())
            }
        }
    }

    /// Render as a single JSON line
    fn render_json(report: &RunReport) -> Result<()> {
        let json = serde_json::to_string(report)?;
        println!("{json}");
        Ok(())
    }

    fn render_plain(report: &RunReport) {
        println!("{}", summary_line(report));
        println!("{}", contention_line(report));
    }

    /// Render as formatted table
    fn render_table(&self, report: &RunReport) {
        println!();
        println!("{}", self.style_heading(&summary_line(report)));

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Worker").add_attribute(Attribute::Bold),
            Cell::new("Resources").add_attribute(Attribute::Bold),
            Cell::new("Cycles").add_attribute(Attribute::Bold),
            Cell::new("Phase").add_attribute(Attribute::Bold),
        ]);

        for worker in &report.workers {
            let id = worker.worker;
            let resources = format!("{} / {}", id.left(), id.right(report.size));
            let phase_cell = if worker.final_phase == WorkerPhase::Done {
                Cell::new(worker.final_phase.to_string()).fg(Color::Green)
            } else {
                Cell::new(worker.final_phase.to_string()).fg(Color::Yellow)
            };

            table.add_row(vec![
                Cell::new(id.to_string()),
                Cell::new(resources),
                Cell::new(worker.cycles_completed.to_string()),
                phase_cell,
            ]);
        }

        println!("{table}");
        println!("{}", contention_line(report));
    }

    fn style_heading(&self, text: &str) -> String {
        if self.supports_color() {
            Style::new().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        if self.format != OutputFormat::Tty {
            return false;
        }
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

fn summary_line(report: &RunReport) -> String {
    format!(
        "Done: {} workers completed {} work units in {}.",
        report.size,
        report.total_work_units,
        format_elapsed(report.elapsed)
    )
}

fn contention_line(report: &RunReport) -> String {
    format!(
        "Seats granted: {} ({} waited), resources granted: {} ({} waited).",
        report.stats.seats_granted,
        report.stats.seat_waits,
        report.stats.resources_granted,
        report.stats.resource_waits
    )
}

/// Format a duration for humans
fn format_elapsed(elapsed: std::time::Duration) -> String {
    let millis = elapsed.as_millis();
    if millis >= 1000 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else if millis > 0 {
        format!("{millis}ms")
    } else {
        format!("{}µs", elapsed.as_micros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatring_types::WorkerId;
    use seatring_worker::WorkerReport;
    use std::time::Duration;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_micros(250)), "250µs");
        assert_eq!(format_elapsed(Duration::from_millis(42)), "42ms");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_json_report_renders() {
        let renderer = OutputRenderer::new(OutputFormat::Json, ColorChoice::Never, false);
        let report = RunReport {
            run_id: "run-1".to_string(),
            size: 2,
            cycles_per_worker: 1,
            workers: vec![WorkerReport {
                worker: WorkerId::new(0),
                cycles_completed: 1,
                final_phase: WorkerPhase::Done,
            }],
            total_work_units: 1,
            stats: Default::default(),
            elapsed: Duration::from_millis(3),
        };
        renderer.render_report(&report).unwrap();
        assert_eq!(
            summary_line(&report),
            "Done: 2 workers completed 1 work units in 3ms."
        );
    }

    #[test]
    fn test_plain_output_never_colors() {
        let renderer = OutputRenderer::new(OutputFormat::Plain, ColorChoice::Always, false);
        assert!(!renderer.supports_color());
        assert_eq!(renderer.style_heading("Done"), "Done");
    }
}
