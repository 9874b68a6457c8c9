//! The worker state machine

use seatring_errors::{Error, Result};
use seatring_events::{AppEvent, EventEmitter, EventSender, FailureContext, WorkerEvent};
use seatring_resources::Arbiter;
use seatring_types::{Side, WorkerId, WorkerPhase};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};
use uuid::Uuid;

/// Outcome of a worker that ran all of its cycles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker: WorkerId,
    pub cycles_completed: u32,
    pub final_phase: WorkerPhase,
}

/// One participant of a table run
///
/// A worker repeatedly takes a seat, picks up its own (left) resource and
/// then its neighbor's (right), performs a unit of work, and puts everything
/// back in the same order before giving up the seat.
#[derive(Debug)]
pub struct Worker {
    id: WorkerId,
    cycles: u32,
    arbiter: Arc<Arbiter>,
    work_duration: Duration,
    event_sender: Option<EventSender>,
    run_id: Option<String>,
    parent_event: Option<Uuid>,
    phase: WorkerPhase,
    cycles_completed: u32,
}

impl Worker {
    #[must_use]
    pub fn new(id: WorkerId, cycles: u32, arbiter: Arc<Arbiter>) -> Self {
        Self {
            id,
            cycles,
            arbiter,
            work_duration: Duration::ZERO,
            event_sender: None,
            run_id: None,
            parent_event: None,
            phase: WorkerPhase::Idle,
            cycles_completed: 0,
        }
    }

    /// Sleep for `duration` on every unit of work instead of yielding
    #[must_use]
    pub fn with_work_duration(mut self, duration: Duration) -> Self {
        self.work_duration = duration;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: Option<EventSender>) -> Self {
        self.event_sender = sender;
        self
    }

    /// Tag every event with the run it belongs to
    #[must_use]
    pub fn with_run(mut self, run_id: impl Into<String>, started_event: Uuid) -> Self {
        self.run_id = Some(run_id.into());
        self.parent_event = Some(started_event);
        self
    }

    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    #[must_use]
    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    /// Run every cycle to completion
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` if `cancel` fires first; whatever the
    /// worker held at that point is released before returning. Arbiter
    /// misuse errors abort the worker and are returned as is.
    pub async fn run(mut self, cancel: &CancellationToken) -> Result<WorkerReport> {
        let arbiter = Arc::clone(&self.arbiter);
        debug!(worker = self.id.index(), cycles = self.cycles, "worker started");

        for cycle in 1..=self.cycles {
            if let Err(err) = self.run_cycle(&arbiter, cycle, cancel).await {
                return Err(self.abort(err));
            }
        }

        if let Err(err) = self.enter(WorkerPhase::Done) {
            return Err(self.abort(err));
        }
        self.report(WorkerEvent::Finished {
            worker: self.id,
            cycles: self.cycles_completed,
        });
        debug!(
            worker = self.id.index(),
            cycles = self.cycles_completed,
            "worker finished"
        );

        Ok(WorkerReport {
            worker: self.id,
            cycles_completed: self.cycles_completed,
            final_phase: self.phase,
        })
    }

    async fn run_cycle(
        &mut self,
        arbiter: &Arbiter,
        cycle: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let size = arbiter.size();
        let left_id = self.id.resource(Side::Left, size);
        let right_id = self.id.resource(Side::Right, size);

        let seat = arbiter.acquire_seat_cancellable(self.id, cancel).await?;
        self.enter(WorkerPhase::Seated)?;
        self.report(WorkerEvent::Seated {
            worker: self.id,
            cycle,
        });

        let left = arbiter
            .acquire_resource_cancellable(&seat, left_id, cancel)
            .await?;
        self.enter(WorkerPhase::HoldingFirst)?;
        self.emit_picked_up(Side::Left, left.resource());

        let right = arbiter
            .acquire_resource_cancellable(&seat, right_id, cancel)
            .await?;
        self.enter(WorkerPhase::HoldingBoth)?;
        self.emit_picked_up(Side::Right, right.resource());

        self.enter(WorkerPhase::Working)?;
        self.report(WorkerEvent::Working {
            worker: self.id,
            cycle,
        });
        self.work(cancel).await?;

        self.enter(WorkerPhase::ReleasingFirst)?;
        left.release();
        self.emit_put_down(Side::Left, left_id);

        self.enter(WorkerPhase::ReleasingSecond)?;
        right.release();
        self.emit_put_down(Side::Right, right_id);

        seat.release();
        self.enter(WorkerPhase::Unseated)?;
        self.report(WorkerEvent::Unseated {
            worker: self.id,
            cycle,
        });

        self.cycles_completed += 1;
        self.enter(WorkerPhase::Idle)
    }

    async fn work(&self, cancel: &CancellationToken) -> Result<()> {
        if self.work_duration.is_zero() {
            tokio::task::yield_now().await;
            return Ok(());
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            () = tokio::time::sleep(self.work_duration) => Ok(()),
        }
    }

    fn enter(&mut self, next: WorkerPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(Error::internal(format!(
                "worker {} cannot move from {} to {next}",
                self.id.index(),
                self.phase
            )));
        }
        trace!(worker = self.id.index(), from = %self.phase, to = %next, "phase");
        self.phase = next;
        Ok(())
    }

    /// Report why the worker stopped and hand the error back
    fn abort(&self, err: Error) -> Error {
        if err.is_cancelled() {
            debug!(
                worker = self.id.index(),
                phase = %self.phase,
                cycles_completed = self.cycles_completed,
                resources_released = self.phase.resources_held(),
                "worker cancelled"
            );
            self.report(WorkerEvent::Cancelled {
                worker: self.id,
                phase: self.phase,
                cycles_completed: self.cycles_completed,
            });
            return Error::Cancelled;
        }

        error!(
            worker = self.id.index(),
            phase = %self.phase,
            resources_released = self.phase.resources_held(),
            error = %err,
            "worker failed"
        );
        self.report(WorkerEvent::Failed {
            worker: self.id,
            phase: self.phase,
            failure: FailureContext::from_error(&err),
        });
        err
    }

    fn report(&self, event: WorkerEvent) {
        let event = AppEvent::Worker(event);
        let mut meta = event.default_meta();
        if let Some(run_id) = &self.run_id {
            meta = meta.with_correlation_id(run_id.clone());
        }
        if let Some(parent) = self.parent_event {
            meta = meta.with_parent(parent);
        }
        self.emit_with_meta(meta, event);
    }

    fn emit_picked_up(&self, side: Side, resource: seatring_types::ResourceId) {
        self.report(WorkerEvent::PickedUp {
            worker: self.id,
            side,
            resource,
        });
    }

    fn emit_put_down(&self, side: Side, resource: seatring_types::ResourceId) {
        self.report(WorkerEvent::PutDown {
            worker: self.id,
            side,
            resource,
        });
    }
}

impl EventEmitter for Worker {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}
