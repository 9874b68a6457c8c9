//! Event handling and progress display

use crate::display::OutputRenderer;
use seatring_events::{AppEvent, EventMessage, GeneralEvent, RunEvent, WorkerEvent};
use tracing::warn;

/// Event handler for progress display and user feedback
pub struct EventHandler {
    renderer: OutputRenderer,
    /// Also show seat transitions and debug messages
    debug_enabled: bool,
}

impl EventHandler {
    /// Create new event handler
    pub fn new(renderer: OutputRenderer, debug_enabled: bool) -> Self {
        Self {
            renderer,
            debug_enabled,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        if self.renderer.is_json() {
            match serde_json::to_string(&message) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "failed to serialize event"),
            }
            return;
        }

        match message.event {
            AppEvent::Worker(event) => self.handle_worker_event(&event),
            AppEvent::General(event) => self.handle_general_event(event),
            AppEvent::Run(event) => self.handle_run_event(&event),
        }
    }

    fn handle_worker_event(&self, event: &WorkerEvent) {
        if let WorkerEvent::Failed {
            worker,
            phase,
            failure,
        } = event
        {
            self.renderer.render_problem(
                "Error:",
                &format!("worker {worker} failed while {phase}: {}", failure.message),
            );
            return;
        }

        if self.renderer.is_quiet() {
            return;
        }

        if let Some(line) = event.progress_line() {
            self.renderer.render_progress(event, &line);
            return;
        }

        let line = match event {
            WorkerEvent::Cancelled {
                worker,
                phase,
                cycles_completed,
            } => format!(
                "Worker {worker} stopped while {phase} after {cycles_completed} cycles."
            ),
            WorkerEvent::Seated { worker, cycle } if self.debug_enabled => {
                format!("Worker {worker} takes a seat for cycle {cycle}.")
            }
            WorkerEvent::Unseated { worker, .. } if self.debug_enabled => {
                format!("Worker {worker} leaves the table.")
            }
            WorkerEvent::Finished { worker, cycles } if self.debug_enabled => {
                format!("Worker {worker} is done after {cycles} cycles.")
            }
            _ => return,
        };
        self.renderer.render_progress(event, &line);
    }

    fn handle_general_event(&self, event: GeneralEvent) {
        match event {
            GeneralEvent::Warning { message, context } => {
                self.renderer.render_problem("Warning:", &format!("{message} ({context})"));
            }
            GeneralEvent::Error { message, details } => {
                self.renderer.render_problem("Error:", &format!("{message}: {details}"));
            }
            GeneralEvent::DebugLog { message, context } => {
                if self.debug_enabled {
                    let mut fields: Vec<_> = context.into_iter().collect();
                    fields.sort();
                    let fields: Vec<String> =
                        fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    eprintln!("[debug] {message} {}", fields.join(" "));
                }
            }
            GeneralEvent::ConfigurationValidated { source } => {
                if self.debug_enabled {
                    eprintln!("[debug] configuration loaded from {source}");
                }
            }
        }
    }

    fn handle_run_event(&self, event: &RunEvent) {
        if !self.debug_enabled {
            return;
        }
        match event {
            RunEvent::Started { run_id, .. } => eprintln!("[debug] run {run_id} started"),
            RunEvent::Completed { run_id, .. } => eprintln!("[debug] run {run_id} completed"),
            RunEvent::Cancelled { run_id } => eprintln!("[debug] run {run_id} cancelled"),
            RunEvent::Failed { run_id, failure } => {
                eprintln!("[debug] run {run_id} failed: {}", failure.message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatring_types::{ColorChoice, OutputFormat, ResourceId, Side, WorkerId};

    #[test]
    fn test_event_handler_accepts_every_domain() {
        let renderer = OutputRenderer::new(OutputFormat::Plain, ColorChoice::Never, false);
        let mut handler = EventHandler::new(renderer, true);

        handler.handle_event(EventMessage::from_event(AppEvent::Worker(
            WorkerEvent::PickedUp {
                worker: WorkerId::new(0),
                side: Side::Left,
                resource: ResourceId::new(0),
            },
        )));
        handler.handle_event(EventMessage::from_event(AppEvent::General(
            GeneralEvent::warning("cycles per worker is 0", "table.cycles_per_worker"),
        )));
        handler.handle_event(EventMessage::from_event(AppEvent::Run(RunEvent::Cancelled {
            run_id: "test".to_string(),
        })));
    }
}
