//! The arbiter monitor: one lock over all shared state, one wait queue per
//! condition.

use crate::guard::{ResourceGuard, SeatPermit};
use crate::snapshot::{ArbiterSnapshot, ArbiterStats};
use seatring_errors::ArbiterError;
use seatring_types::{ResourceId, WorkerId};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Shared state, only ever touched with the arbiter lock held
#[derive(Debug)]
struct TableState {
    active_seats: usize,
    seated: Vec<bool>,
    holders: Vec<Option<WorkerId>>,
    stats: ArbiterStats,
}

/// Monitor that hands out seats and resources on a ring of `size` slots
///
/// At most `size - 1` seats are outstanding at any time. Since every worker
/// needs a seat before it may take resources, at least one seated worker can
/// always obtain both of its neighbors, which rules out the circular wait.
///
/// The lock is a `std::sync::Mutex` that is never held across an `.await`;
/// blocked callers park on a [`Notify`] (one for seats, one per resource)
/// and re-check their predicate every time they are woken.
#[derive(Debug)]
pub struct Arbiter {
    size: usize,
    seat_limit: usize,
    state: Mutex<TableState>,
    seat_available: Notify,
    resource_available: Box<[Notify]>,
}

impl Arbiter {
    /// Create an arbiter for a ring of `size` resources and workers
    ///
    /// # Errors
    ///
    /// Returns `ArbiterError::TableTooSmall` if `size < 2`.
    pub fn new(size: usize) -> Result<Self, ArbiterError> {
        if size < 2 {
            return Err(ArbiterError::TableTooSmall { size });
        }

        Ok(Self {
            size,
            seat_limit: size - 1,
            state: Mutex::new(TableState {
                active_seats: 0,
                seated: vec![false; size],
                holders: vec![None; size],
                stats: ArbiterStats::default(),
            }),
            seat_available: Notify::new(),
            resource_available: (0..size).map(|_| Notify::new()).collect(),
        })
    }

    /// Number of resources (and workers) on the ring
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Maximum number of seats outstanding at once
    #[must_use]
    pub fn seat_limit(&self) -> usize {
        self.seat_limit
    }

    /// Wait for a seat and take it
    ///
    /// # Errors
    ///
    /// Fails fast with `WorkerOutOfRange` or `AlreadySeated` on misuse, and
    /// with `LockPoisoned` if the state lock was poisoned.
    pub async fn acquire_seat(&self, worker: WorkerId) -> Result<SeatPermit<'_>, ArbiterError> {
        self.wait_for_seat(worker, None).await
    }

    /// Like [`Arbiter::acquire_seat`], but gives up when `cancel` fires
    ///
    /// # Errors
    ///
    /// Returns `ArbiterError::Cancelled` if the token is cancelled while the
    /// caller is waiting. Nothing is committed in that case.
    pub async fn acquire_seat_cancellable(
        &self,
        worker: WorkerId,
        cancel: &CancellationToken,
    ) -> Result<SeatPermit<'_>, ArbiterError> {
        self.wait_for_seat(worker, Some(cancel)).await
    }

    /// Take a seat if one is free right now
    ///
    /// # Errors
    ///
    /// Same misuse errors as [`Arbiter::acquire_seat`].
    pub fn try_acquire_seat(
        &self,
        worker: WorkerId,
    ) -> Result<Option<SeatPermit<'_>>, ArbiterError> {
        self.check_worker(worker)?;
        let mut state = self.lock_state()?;
        if self.try_take_seat(&mut state, worker, false)? {
            Ok(Some(SeatPermit::new(self, worker)))
        } else {
            Ok(None)
        }
    }

    /// Wait for `resource` to be free and take it for the seat's worker
    ///
    /// The returned guard borrows `seat`, so the seat cannot be released
    /// while the resource is still held.
    ///
    /// # Errors
    ///
    /// Fails fast with `ResourceOutOfRange`, `ForeignSeat` or `AlreadyHeld`
    /// on misuse.
    pub async fn acquire_resource<'s>(
        &self,
        seat: &'s SeatPermit<'_>,
        resource: ResourceId,
    ) -> Result<ResourceGuard<'s>, ArbiterError> {
        self.wait_for_resource(seat, resource, None).await
    }

    /// Like [`Arbiter::acquire_resource`], but gives up when `cancel` fires
    ///
    /// # Errors
    ///
    /// Returns `ArbiterError::Cancelled` if the token is cancelled while the
    /// caller is waiting. Nothing is committed in that case.
    pub async fn acquire_resource_cancellable<'s>(
        &self,
        seat: &'s SeatPermit<'_>,
        resource: ResourceId,
        cancel: &CancellationToken,
    ) -> Result<ResourceGuard<'s>, ArbiterError> {
        self.wait_for_resource(seat, resource, Some(cancel)).await
    }

    /// Take `resource` if it is free right now
    ///
    /// # Errors
    ///
    /// Same misuse errors as [`Arbiter::acquire_resource`].
    pub fn try_acquire_resource<'s>(
        &self,
        seat: &'s SeatPermit<'_>,
        resource: ResourceId,
    ) -> Result<Option<ResourceGuard<'s>>, ArbiterError> {
        self.check_seat(seat)?;
        self.check_resource(resource)?;
        let mut state = self.lock_state()?;
        if self.try_take_resource(&mut state, seat.worker(), resource, false)? {
            Ok(Some(ResourceGuard::new(seat, resource)))
        } else {
            Ok(None)
        }
    }

    /// Consistent copy of the shared state, taken under the lock
    ///
    /// # Errors
    ///
    /// Returns `LockPoisoned` if the state lock was poisoned.
    pub fn snapshot(&self) -> Result<ArbiterSnapshot, ArbiterError> {
        let state = self.lock_state()?;
        Ok(ArbiterSnapshot {
            size: self.size,
            seat_limit: self.seat_limit,
            active_seats: state.active_seats,
            seated: state.seated.clone(),
            holders: state.holders.clone(),
            stats: state.stats.clone(),
        })
    }

    async fn wait_for_seat(
        &self,
        worker: WorkerId,
        cancel: Option<&CancellationToken>,
    ) -> Result<SeatPermit<'_>, ArbiterError> {
        self.check_worker(worker)?;
        self.guarded_wait(&self.seat_available, cancel, "acquire_seat", |state, blocked| {
            self.try_take_seat(state, worker, blocked)
        })
        .await?;
        debug!(worker = worker.index(), "seat granted");
        Ok(SeatPermit::new(self, worker))
    }

    async fn wait_for_resource<'s>(
        &self,
        seat: &'s SeatPermit<'_>,
        resource: ResourceId,
        cancel: Option<&CancellationToken>,
    ) -> Result<ResourceGuard<'s>, ArbiterError> {
        self.check_seat(seat)?;
        self.check_resource(resource)?;
        let worker = seat.worker();
        let notify = &self.resource_available[resource.index()];
        self.guarded_wait(notify, cancel, "acquire_resource", |state, blocked| {
            self.try_take_resource(state, worker, resource, blocked)
        })
        .await?;
        trace!(
            worker = worker.index(),
            resource = resource.index(),
            "resource granted"
        );
        Ok(ResourceGuard::new(seat, resource))
    }

    /// Block on `notify` until `try_commit` reports success
    ///
    /// The waiter registers with `notify` before it inspects the state, so a
    /// release that lands between the check and the wait is never missed.
    /// The commit happens inside the same critical section as the check;
    /// until then nothing is mutated, which makes dropping this future at
    /// the await point harmless. A `Notified` that is dropped after taking a
    /// `notify_one` hands the wakeup on to the next waiter.
    async fn guarded_wait<F>(
        &self,
        notify: &Notify,
        cancel: Option<&CancellationToken>,
        operation: &'static str,
        mut try_commit: F,
    ) -> Result<(), ArbiterError>
    where
        F: FnMut(&mut TableState, bool) -> Result<bool, ArbiterError>,
    {
        let mut blocked = false;
        loop {
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let committed = {
                let mut state = self.lock_state()?;
                try_commit(&mut *state, blocked)?
            };
            if committed {
                return Ok(());
            }

            if !blocked {
                trace!(operation, "waiting");
            }
            blocked = true;

            match cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => {
                            debug!(operation, "wait cancelled");
                            return Err(ArbiterError::Cancelled {
                                operation: operation.to_string(),
                            });
                        }
                        () = &mut notified => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    fn try_take_seat(
        &self,
        state: &mut TableState,
        worker: WorkerId,
        blocked: bool,
    ) -> Result<bool, ArbiterError> {
        let slot = worker.index();
        if state.seated[slot] {
            return Err(ArbiterError::AlreadySeated { worker: slot });
        }
        if state.active_seats >= self.seat_limit {
            return Ok(false);
        }

        state.active_seats += 1;
        state.seated[slot] = true;
        state.stats.seats_granted += 1;
        if blocked {
            state.stats.seat_waits += 1;
        }
        Ok(true)
    }

    fn try_take_resource(
        &self,
        state: &mut TableState,
        worker: WorkerId,
        resource: ResourceId,
        blocked: bool,
    ) -> Result<bool, ArbiterError> {
        if !state.seated[worker.index()] {
            return Err(ArbiterError::InvariantViolated {
                message: format!(
                    "worker {} requested resource {resource} without a seat",
                    worker.index()
                ),
            });
        }

        match state.holders[resource.index()] {
            Some(holder) if holder == worker => Err(ArbiterError::AlreadyHeld {
                worker: worker.index(),
                resource: resource.index(),
            }),
            Some(_) => Ok(false),
            None => {
                state.holders[resource.index()] = Some(worker);
                state.stats.resources_granted += 1;
                if blocked {
                    state.stats.resource_waits += 1;
                }
                Ok(true)
            }
        }
    }

    /// Give a seat back and wake one seat waiter
    pub(crate) fn release_seat(&self, worker: WorkerId) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = worker.index();

        if !state.seated[slot] || state.active_seats == 0 {
            drop(state);
            error!(worker = slot, "seat released by a worker that holds none");
            return;
        }
        if state.holders.contains(&Some(worker)) {
            error!(worker = slot, "seat released while resources are still held");
        }

        state.seated[slot] = false;
        state.active_seats -= 1;
        let below_limit = state.active_seats < self.seat_limit;
        drop(state);

        debug!(worker = slot, "seat released");
        if below_limit {
            self.seat_available.notify_one();
        }
    }

    /// Mark a resource free and wake one of its waiters
    pub(crate) fn release_resource(&self, worker: WorkerId, resource: ResourceId) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = resource.index();

        if state.holders[slot] != Some(worker) {
            let holder = state.holders[slot];
            drop(state);
            error!(
                worker = worker.index(),
                resource = slot,
                holder = ?holder,
                "resource released by a worker that does not hold it"
            );
            return;
        }

        state.holders[slot] = None;
        drop(state);

        trace!(worker = worker.index(), resource = slot, "resource released");
        self.resource_available[slot].notify_one();
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, TableState>, ArbiterError> {
        self.state.lock().map_err(|_| ArbiterError::LockPoisoned)
    }

    fn check_worker(&self, worker: WorkerId) -> Result<(), ArbiterError> {
        if worker.index() >= self.size {
            return Err(ArbiterError::WorkerOutOfRange {
                worker: worker.index(),
                size: self.size,
            });
        }
        Ok(())
    }

    fn check_resource(&self, resource: ResourceId) -> Result<(), ArbiterError> {
        if resource.index() >= self.size {
            return Err(ArbiterError::ResourceOutOfRange {
                resource: resource.index(),
                size: self.size,
            });
        }
        Ok(())
    }

    fn check_seat(&self, seat: &SeatPermit<'_>) -> Result<(), ArbiterError> {
        if !std::ptr::eq(seat.arbiter(), self) {
            return Err(ArbiterError::ForeignSeat {
                worker: seat.worker().index(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_tiny_tables() {
        assert_eq!(
            Arbiter::new(1).unwrap_err(),
            ArbiterError::TableTooSmall { size: 1 }
        );
        assert!(Arbiter::new(0).is_err());
        let arbiter = Arbiter::new(2).unwrap();
        assert_eq!(arbiter.seat_limit(), 1);
    }

    #[test]
    fn try_acquire_respects_seat_limit() {
        let arbiter = Arbiter::new(3).unwrap();
        let first = arbiter.try_acquire_seat(WorkerId::new(0)).unwrap();
        let second = arbiter.try_acquire_seat(WorkerId::new(1)).unwrap();
        assert!(first.is_some());
        assert!(second.is_some());
        assert!(arbiter.try_acquire_seat(WorkerId::new(2)).unwrap().is_none());

        drop(first);
        assert!(arbiter.try_acquire_seat(WorkerId::new(2)).unwrap().is_some());
    }

    #[test]
    fn double_seat_is_rejected() {
        let arbiter = Arbiter::new(4).unwrap();
        let _seat = arbiter.try_acquire_seat(WorkerId::new(1)).unwrap();
        assert_eq!(
            arbiter.try_acquire_seat(WorkerId::new(1)).unwrap_err(),
            ArbiterError::AlreadySeated { worker: 1 }
        );
    }

    #[test]
    fn holder_is_recorded_and_cleared() {
        let arbiter = Arbiter::new(3).unwrap();
        let seat = arbiter.try_acquire_seat(WorkerId::new(2)).unwrap().unwrap();
        let guard = arbiter
            .try_acquire_resource(&seat, ResourceId::new(0))
            .unwrap()
            .unwrap();

        let snapshot = arbiter.snapshot().unwrap();
        assert_eq!(snapshot.holders[0], Some(WorkerId::new(2)));
        assert_eq!(snapshot.held_count(), 1);

        guard.release();
        seat.release();
        let snapshot = arbiter.snapshot().unwrap();
        assert!(snapshot.is_idle());
        assert_eq!(snapshot.stats.resources_granted, 1);
        assert_eq!(snapshot.stats.seats_granted, 1);
    }
}
