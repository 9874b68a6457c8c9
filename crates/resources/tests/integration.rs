//! Integration tests for the arbiter

#[cfg(test)]
mod tests {
    use seatring_errors::ArbiterError;
    use seatring_resources::Arbiter;
    use seatring_types::{ResourceId, WorkerId};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    const PENDING: Duration = Duration::from_millis(50);
    const SETTLE: Duration = Duration::from_secs(5);

    fn worker(index: usize) -> WorkerId {
        WorkerId::new(index)
    }

    fn resource(index: usize) -> ResourceId {
        ResourceId::new(index)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_seat_bound_blocks_until_release() {
        let arbiter = Arc::new(Arbiter::new(3).unwrap());
        let first = arbiter.acquire_seat(worker(0)).await.unwrap();
        let _second = arbiter.acquire_seat(worker(1)).await.unwrap();

        let (seated_tx, mut seated_rx) = oneshot::channel();
        let waiter = {
            let arbiter = Arc::clone(&arbiter);
            tokio::spawn(async move {
                let seat = arbiter.acquire_seat(worker(2)).await.unwrap();
                seated_tx.send(()).unwrap();
                seat.release();
            })
        };

        assert!(timeout(PENDING, &mut seated_rx).await.is_err());
        assert_eq!(arbiter.snapshot().unwrap().active_seats, 2);

        first.release();
        timeout(SETTLE, seated_rx).await.unwrap().unwrap();
        waiter.await.unwrap();

        let snapshot = arbiter.snapshot().unwrap();
        assert_eq!(snapshot.active_seats, 1);
        assert_eq!(snapshot.stats.seat_waits, 1);
        snapshot.check_invariants().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_resource_mutual_exclusion() {
        let arbiter = Arc::new(Arbiter::new(5).unwrap());
        let seat = arbiter.acquire_seat(worker(0)).await.unwrap();
        let shared = arbiter.acquire_resource(&seat, resource(1)).await.unwrap();

        let (taken_tx, mut taken_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let neighbor = {
            let arbiter = Arc::clone(&arbiter);
            tokio::spawn(async move {
                let seat = arbiter.acquire_seat(worker(1)).await.unwrap();
                assert!(arbiter
                    .try_acquire_resource(&seat, resource(1))
                    .unwrap()
                    .is_none());
                let guard = arbiter.acquire_resource(&seat, resource(1)).await.unwrap();
                taken_tx.send(()).unwrap();
                done_rx.await.unwrap();
                guard.release();
                seat.release();
            })
        };

        assert!(timeout(PENDING, &mut taken_rx).await.is_err());
        let snapshot = arbiter.snapshot().unwrap();
        assert_eq!(snapshot.holders[1], Some(worker(0)));

        shared.release();
        timeout(SETTLE, taken_rx).await.unwrap().unwrap();

        let snapshot = arbiter.snapshot().unwrap();
        assert_eq!(snapshot.holders[1], Some(worker(1)));
        assert_eq!(snapshot.held_count(), 1);
        snapshot.check_invariants().unwrap();

        done_tx.send(()).unwrap();
        neighbor.await.unwrap();
        seat.release();
        assert!(arbiter.snapshot().unwrap().is_idle());
    }

    #[tokio::test]
    async fn test_release_restores_availability() {
        let arbiter = Arbiter::new(4).unwrap();
        let seat = arbiter.acquire_seat(worker(2)).await.unwrap();
        let guard = arbiter.acquire_resource(&seat, resource(3)).await.unwrap();
        guard.release();

        let other = arbiter.acquire_seat(worker(3)).await.unwrap();
        let again = arbiter
            .try_acquire_resource(&other, resource(3))
            .unwrap()
            .expect("released resource should be free");
        assert_eq!(again.resource(), resource(3));
        assert_eq!(again.worker(), worker(3));
    }

    #[tokio::test]
    async fn test_out_of_range_fails_fast() {
        let arbiter = Arbiter::new(5).unwrap();
        assert_eq!(
            arbiter.acquire_seat(worker(5)).await.unwrap_err(),
            ArbiterError::WorkerOutOfRange { worker: 5, size: 5 }
        );

        let seat = arbiter.acquire_seat(worker(0)).await.unwrap();
        assert_eq!(
            arbiter.acquire_resource(&seat, resource(7)).await.unwrap_err(),
            ArbiterError::ResourceOutOfRange {
                resource: 7,
                size: 5
            }
        );
        assert_eq!(arbiter.snapshot().unwrap().held_count(), 0);
    }

    #[tokio::test]
    async fn test_unbalanced_acquire_fails_fast() {
        let arbiter = Arbiter::new(3).unwrap();
        let seat = arbiter.acquire_seat(worker(1)).await.unwrap();
        assert_eq!(
            arbiter.acquire_seat(worker(1)).await.unwrap_err(),
            ArbiterError::AlreadySeated { worker: 1 }
        );

        let _held = arbiter.acquire_resource(&seat, resource(1)).await.unwrap();
        assert_eq!(
            arbiter.acquire_resource(&seat, resource(1)).await.unwrap_err(),
            ArbiterError::AlreadyHeld {
                worker: 1,
                resource: 1
            }
        );
    }

    #[tokio::test]
    async fn test_foreign_seat_is_rejected() {
        let left = Arbiter::new(3).unwrap();
        let right = Arbiter::new(3).unwrap();
        let seat = left.acquire_seat(worker(0)).await.unwrap();
        assert_eq!(
            right.acquire_resource(&seat, resource(0)).await.unwrap_err(),
            ArbiterError::ForeignSeat { worker: 0 }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_while_waiting_for_seat() {
        let arbiter = Arbiter::new(2).unwrap();
        let seat = arbiter.acquire_seat(worker(0)).await.unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(PENDING).await;
            trigger.cancel();
        });

        let result = timeout(SETTLE, arbiter.acquire_seat_cancellable(worker(1), &cancel))
            .await
            .unwrap();
        assert!(matches!(result, Err(ArbiterError::Cancelled { .. })));

        let snapshot = arbiter.snapshot().unwrap();
        assert_eq!(snapshot.active_seats, 1);
        assert!(!snapshot.is_seated(worker(1)));

        seat.release();
        assert!(arbiter.try_acquire_seat(worker(1)).unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_while_waiting_for_resource() {
        let arbiter = Arbiter::new(3).unwrap();
        let owner = arbiter.acquire_seat(worker(0)).await.unwrap();
        let held = arbiter.acquire_resource(&owner, resource(1)).await.unwrap();
        let waiter = arbiter.acquire_seat(worker(1)).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = arbiter
            .acquire_resource_cancellable(&waiter, resource(1), &cancel)
            .await;
        assert!(matches!(result, Err(ArbiterError::Cancelled { .. })));

        let snapshot = arbiter.snapshot().unwrap();
        assert_eq!(snapshot.holders[1], Some(worker(0)));
        assert!(!snapshot.holders.contains(&Some(worker(1))));

        held.release();
        let fresh = CancellationToken::new();
        let guard = arbiter
            .acquire_resource_cancellable(&waiter, resource(1), &fresh)
            .await
            .unwrap();
        assert_eq!(guard.worker(), worker(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_aborted_waiter_does_not_swallow_wakeup() {
        let arbiter = Arc::new(Arbiter::new(4).unwrap());
        let owner = arbiter.acquire_seat(worker(0)).await.unwrap();
        let held = arbiter.acquire_resource(&owner, resource(2)).await.unwrap();

        let spawn_waiter = |index: usize| {
            let arbiter = Arc::clone(&arbiter);
            let (tx, rx) = oneshot::channel();
            let handle = tokio::spawn(async move {
                let seat = arbiter.acquire_seat(worker(index)).await.unwrap();
                let guard = arbiter.acquire_resource(&seat, resource(2)).await.unwrap();
                let _ = tx.send(guard.worker());
            });
            (handle, rx)
        };

        let (doomed, _doomed_rx) = spawn_waiter(1);
        let (survivor, survivor_rx) = spawn_waiter(2);

        // Let both tasks park on the resource
        tokio::time::sleep(PENDING).await;
        doomed.abort();
        assert!(doomed.await.unwrap_err().is_cancelled());

        let snapshot = arbiter.snapshot().unwrap();
        assert!(!snapshot.is_seated(worker(1)));
        assert_eq!(snapshot.holders[2], Some(worker(0)));

        held.release();
        let winner = timeout(SETTLE, survivor_rx).await.unwrap().unwrap();
        assert_eq!(winner, worker(2));
        survivor.await.unwrap();

        owner.release();
        assert!(arbiter.snapshot().unwrap().is_idle());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_holder_releases_everything() {
        let arbiter = Arc::new(Arbiter::new(3).unwrap());
        let task = {
            let arbiter = Arc::clone(&arbiter);
            tokio::spawn(async move {
                let seat = arbiter.acquire_seat(worker(1)).await.unwrap();
                let _left = arbiter.acquire_resource(&seat, resource(1)).await.unwrap();
                let _right = arbiter.acquire_resource(&seat, resource(2)).await.unwrap();
                panic!("worker died mid-cycle");
            })
        };

        assert!(task.await.unwrap_err().is_panic());
        let snapshot = arbiter.snapshot().unwrap();
        assert!(snapshot.is_idle());
        snapshot.check_invariants().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_raw_ring_never_violates_invariants() {
        const SIZE: usize = 5;
        const CYCLES: usize = 200;

        let arbiter = Arc::new(Arbiter::new(SIZE).unwrap());
        let stop = CancellationToken::new();

        let monitor = {
            let arbiter = Arc::clone(&arbiter);
            let stop = stop.clone();
            tokio::spawn(async move {
                let mut checks = 0usize;
                while !stop.is_cancelled() {
                    let snapshot = arbiter.snapshot().unwrap();
                    snapshot.check_invariants().unwrap();
                    assert!(snapshot.active_seats < SIZE);
                    checks += 1;
                    tokio::task::yield_now().await;
                }
                checks
            })
        };

        let mut handles = Vec::new();
        for id in WorkerId::all(SIZE) {
            let arbiter = Arc::clone(&arbiter);
            handles.push(tokio::spawn(async move {
                for _ in 0..CYCLES {
                    let seat = arbiter.acquire_seat(id).await.unwrap();
                    let left = arbiter.acquire_resource(&seat, id.left()).await.unwrap();
                    let right = arbiter
                        .acquire_resource(&seat, id.right(SIZE))
                        .await
                        .unwrap();
                    tokio::task::yield_now().await;
                    left.release();
                    right.release();
                    seat.release();
                }
            }));
        }

        timeout(Duration::from_secs(30), async {
            for handle in handles {
                handle.await.unwrap();
            }
        })
        .await
        .expect("ring stalled");

        stop.cancel();
        assert!(monitor.await.unwrap() > 0);

        let snapshot = arbiter.snapshot().unwrap();
        assert!(snapshot.is_idle());
        assert_eq!(snapshot.stats.seats_granted, (SIZE * CYCLES) as u64);
        assert_eq!(snapshot.stats.resources_granted, (2 * SIZE * CYCLES) as u64);
    }
}
