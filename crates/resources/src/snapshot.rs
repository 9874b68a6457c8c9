//! Point-in-time views of the arbiter state
//!
//! Snapshots are copied out under the arbiter lock, so every invariant that
//! holds inside the monitor also holds for the snapshot.

use seatring_errors::ArbiterError;
use seatring_types::WorkerId;
use serde::{Deserialize, Serialize};

/// Counters accumulated over the arbiter's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterStats {
    /// Seats handed out
    pub seats_granted: u64,
    /// Resources handed out
    pub resources_granted: u64,
    /// Seat acquisitions that had to block at least once
    pub seat_waits: u64,
    /// Resource acquisitions that had to block at least once
    pub resource_waits: u64,
}

/// Copy of the arbiter state at one instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbiterSnapshot {
    pub size: usize,
    pub seat_limit: usize,
    pub active_seats: usize,
    /// Seat flag per worker
    pub seated: Vec<bool>,
    /// Holder per resource
    pub holders: Vec<Option<WorkerId>>,
    pub stats: ArbiterStats,
}

impl ArbiterSnapshot {
    /// Number of resources currently held
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.holders.iter().filter(|holder| holder.is_some()).count()
    }

    #[must_use]
    pub fn is_seated(&self, worker: WorkerId) -> bool {
        self.seated.get(worker.index()).copied().unwrap_or(false)
    }

    /// No seats issued and no resources held
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active_seats == 0 && self.held_count() == 0
    }

    /// Verify the admission bound, seat bookkeeping and that only seated
    /// workers hold resources
    ///
    /// # Errors
    ///
    /// Returns `ArbiterError::InvariantViolated` describing the first
    /// violation found.
    pub fn check_invariants(&self) -> Result<(), ArbiterError> {
        if self.active_seats > self.seat_limit {
            return Err(violation(format!(
                "{} seats active, limit is {}",
                self.active_seats, self.seat_limit
            )));
        }

        let seated = self.seated.iter().filter(|seated| **seated).count();
        if seated != self.active_seats {
            return Err(violation(format!(
                "{seated} workers seated but seat counter is {}",
                self.active_seats
            )));
        }

        for (index, holder) in self.holders.iter().enumerate() {
            if let Some(worker) = holder {
                if !self.is_seated(*worker) {
                    return Err(violation(format!(
                        "resource {index} held by unseated worker {}",
                        worker.index()
                    )));
                }
            }
        }

        Ok(())
    }
}

fn violation(message: String) -> ArbiterError {
    ArbiterError::InvariantViolated { message }
}
