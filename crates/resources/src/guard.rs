//! RAII handles for seats and resources
//!
//! Dropping a handle performs the matching release, so a worker that is
//! aborted mid-cycle (task abort, cancellation, panic) still gives back
//! everything it held.

use crate::arbiter::Arbiter;
use seatring_types::{ResourceId, WorkerId};

/// A seat held by one worker
///
/// Resources can only be acquired through a seat, and every
/// [`ResourceGuard`] borrows the seat it was acquired with.
#[must_use = "dropping a seat permit releases the seat immediately"]
#[derive(Debug)]
pub struct SeatPermit<'a> {
    arbiter: &'a Arbiter,
    worker: WorkerId,
}

impl<'a> SeatPermit<'a> {
    pub(crate) fn new(arbiter: &'a Arbiter, worker: WorkerId) -> Self {
        Self { arbiter, worker }
    }

    /// Worker this seat was issued to
    #[must_use]
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub(crate) fn arbiter(&self) -> &'a Arbiter {
        self.arbiter
    }

    /// Give the seat back, waking one worker waiting for a seat
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for SeatPermit<'_> {
    fn drop(&mut self) {
        self.arbiter.release_seat(self.worker);
    }
}

/// A resource held by a seated worker
#[must_use = "dropping a resource guard releases the resource immediately"]
#[derive(Debug)]
pub struct ResourceGuard<'s> {
    arbiter: &'s Arbiter,
    worker: WorkerId,
    resource: ResourceId,
}

impl<'s> ResourceGuard<'s> {
    pub(crate) fn new(seat: &'s SeatPermit<'_>, resource: ResourceId) -> Self {
        Self {
            arbiter: seat.arbiter(),
            worker: seat.worker(),
            resource,
        }
    }

    #[must_use]
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    #[must_use]
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Give the resource back, waking one worker waiting for it
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ResourceGuard<'_> {
    fn drop(&mut self) {
        self.arbiter.release_resource(self.worker, self.resource);
    }
}
