use serde::{Deserialize, Serialize};
use seatring_types::{ResourceId, Side, WorkerId, WorkerPhase};

/// Worker domain events, one per state-machine transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerEvent {
    /// Worker obtained a seat
    Seated { worker: WorkerId, cycle: u32 },

    /// Worker acquired one of its resources
    PickedUp {
        worker: WorkerId,
        side: Side,
        resource: ResourceId,
    },

    /// Worker holds both resources and performs its unit of work
    Working { worker: WorkerId, cycle: u32 },

    /// Worker released one of its resources
    PutDown {
        worker: WorkerId,
        side: Side,
        resource: ResourceId,
    },

    /// Worker gave its seat back
    Unseated { worker: WorkerId, cycle: u32 },

    /// Worker completed all of its cycles
    Finished { worker: WorkerId, cycles: u32 },

    /// Worker stopped early because the run was cancelled
    Cancelled {
        worker: WorkerId,
        phase: WorkerPhase,
        cycles_completed: u32,
    },

    /// Worker aborted on an error
    Failed {
        worker: WorkerId,
        phase: WorkerPhase,
        failure: super::FailureContext,
    },
}

impl WorkerEvent {
    /// Worker that emitted this event
    #[must_use]
    pub fn worker(&self) -> WorkerId {
        match self {
            Self::Seated { worker, .. }
            | Self::PickedUp { worker, .. }
            | Self::Working { worker, .. }
            | Self::PutDown { worker, .. }
            | Self::Unseated { worker, .. }
            | Self::Finished { worker, .. }
            | Self::Cancelled { worker, .. }
            | Self::Failed { worker, .. } => *worker,
        }
    }

    /// Human-readable progress line, for the events that have one
    ///
    /// Seat transitions and terminal events are not part of the classic
    /// progress output and return `None`.
    #[must_use]
    pub fn progress_line(&self) -> Option<String> {
        match self {
            Self::PickedUp { worker, side, .. } => {
                Some(format!("Worker {} picks up {side} resource.", worker.number()))
            }
            Self::Working { worker, .. } => Some(format!("Worker {} works.", worker.number())),
            Self::PutDown { worker, side, .. } => {
                Some(format!("Worker {} puts down {side} resource.", worker.number()))
            }
            _ => None,
        }
    }
}
