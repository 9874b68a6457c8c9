//! Table run driver: one arbiter, N worker tasks, one report

use crate::worker::{Worker, WorkerReport};
use seatring_config::TableConfig;
use seatring_errors::{ArbiterError, Error, Result, RunError};
use seatring_events::{
    AppEvent, EventEmitter, EventSender, FailureContext, GeneralEvent, RunEvent,
};
use seatring_resources::{Arbiter, ArbiterSnapshot, ArbiterStats};
use seatring_types::WorkerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Summary of a completed table run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub size: usize,
    pub cycles_per_worker: u32,
    /// One report per worker, ordered by worker id
    pub workers: Vec<WorkerReport>,
    pub total_work_units: u64,
    pub stats: ArbiterStats,
    pub elapsed: Duration,
}

/// Run one table to completion
///
/// Builds an arbiter for `config.size`, spawns one task per worker and joins
/// them all. If a worker fails, the remaining workers are cancelled and the
/// first real failure is returned once every task has finished. Cancelling
/// `cancel` stops the whole run.
///
/// # Errors
///
/// - `Error::Cancelled` if the run was cancelled
/// - `RunError::WorkerPanicked` if a worker task panicked
/// - the worker's own error if it aborted
/// - `ArbiterError::InvariantViolated` if seats or resources are still
///   outstanding after all workers finished
pub async fn run_table(
    config: &TableConfig,
    events: Option<EventSender>,
    cancel: CancellationToken,
) -> Result<RunReport> {
    let arbiter = Arc::new(Arbiter::new(config.size)?);
    let run_id = Uuid::new_v4().to_string();
    let started = Instant::now();
    // Failing workers stop their siblings without cancelling the caller's token
    let run_token = cancel.child_token();

    info!(
        run_id = %run_id,
        size = config.size,
        cycles = config.cycles_per_worker,
        "table run starting"
    );
    let started_event = emit_run_event(
        events.as_ref(),
        &run_id,
        RunEvent::Started {
            run_id: run_id.clone(),
            size: config.size,
            cycles_per_worker: config.cycles_per_worker,
        },
    );

    let mut tasks = JoinSet::new();
    let mut task_workers = HashMap::with_capacity(config.size);
    for id in WorkerId::all(config.size) {
        let worker = Worker::new(id, config.cycles_per_worker, Arc::clone(&arbiter))
            .with_work_duration(config.work_duration())
            .with_event_sender(events.clone())
            .with_run(run_id.clone(), started_event);
        let token = run_token.clone();
        let handle = tasks.spawn(async move { worker.run(&token).await });
        task_workers.insert(handle.id(), id);
    }

    let mut reports = Vec::with_capacity(config.size);
    let mut failure: Option<Error> = None;
    while let Some(joined) = tasks.join_next().await {
        let err = match joined {
            Ok(Ok(report)) => {
                reports.push(report);
                continue;
            }
            Ok(Err(err)) => err,
            Err(join_err) => {
                let worker = task_workers
                    .get(&join_err.id())
                    .map_or(usize::MAX, |id| id.index());
                if join_err.is_panic() {
                    error!(worker, "worker task panicked");
                    RunError::WorkerPanicked { worker }.into()
                } else {
                    RunError::JoinFailed {
                        message: join_err.to_string(),
                    }
                    .into()
                }
            }
        };

        if !err.is_cancelled() && !run_token.is_cancelled() {
            warn!(error = %err, "worker failed, cancelling the rest of the table");
            run_token.cancel();
        }
        failure = Some(match failure {
            Some(previous) if !previous.is_cancelled() || err.is_cancelled() => previous,
            _ => err,
        });
    }

    let snapshot = arbiter.snapshot()?;
    let conservation = check_conservation(&snapshot);

    if let Some(err) = failure {
        if let Err(violation) = conservation {
            report_unreleased(events.as_ref(), &run_id, &violation);
        }
        if err.is_cancelled() {
            warn!(run_id = %run_id, "table run cancelled");
            let cancelled = RunEvent::Cancelled {
                run_id: run_id.clone(),
            };
            emit_run_event(events.as_ref(), &run_id, cancelled);
        } else {
            error!(run_id = %run_id, error = %err, "table run failed");
            emit_run_event(
                events.as_ref(),
                &run_id,
                RunEvent::Failed {
                    run_id: run_id.clone(),
                    failure: FailureContext::from_error(&err),
                },
            );
        }
        return Err(err);
    }
    conservation?;

    reports.sort_by_key(|report| report.worker);
    let total_work_units = reports
        .iter()
        .map(|report| u64::from(report.cycles_completed))
        .sum();
    let elapsed = started.elapsed();

    info!(
        run_id = %run_id,
        total_work_units,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "table run completed"
    );
    emit_run_event(
        events.as_ref(),
        &run_id,
        RunEvent::Completed {
            run_id: run_id.clone(),
            total_work_units,
            duration: elapsed,
        },
    );

    Ok(RunReport {
        run_id,
        size: config.size,
        cycles_per_worker: config.cycles_per_worker,
        workers: reports,
        total_work_units,
        stats: snapshot.stats,
        elapsed,
    })
}

fn emit_run_event(events: Option<&EventSender>, run_id: &str, event: RunEvent) -> Uuid {
    emit_correlated(events, run_id, AppEvent::Run(event))
}

/// Emit an event correlated with `run_id`, returning its event id
fn emit_correlated(events: Option<&EventSender>, run_id: &str, event: AppEvent) -> Uuid {
    let meta = event.default_meta().with_correlation_id(run_id);
    let event_id = meta.event_id;
    if let Some(sender) = events {
        sender.emit_with_meta(meta, event);
    }
    event_id
}

/// Surface state a failed run left behind without masking the run's own error
fn report_unreleased(events: Option<&EventSender>, run_id: &str, violation: &Error) {
    error!(run_id = %run_id, error = %violation, "arbiter not idle after failed run");
    emit_correlated(
        events,
        run_id,
        AppEvent::General(GeneralEvent::error(
            "arbiter not idle after failed run",
            violation.to_string(),
        )),
    );
}

/// Every seat and every resource must be back with the arbiter
fn check_conservation(snapshot: &ArbiterSnapshot) -> Result<()> {
    snapshot.check_invariants()?;
    if !snapshot.is_idle() {
        return Err(ArbiterError::InvariantViolated {
            message: format!(
                "{} seats and {} resources still outstanding after all workers finished",
                snapshot.active_seats,
                snapshot.held_count()
            ),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatring_types::ResourceId;

    #[test]
    fn conservation_fails_while_a_seat_is_outstanding() {
        let arbiter = Arbiter::new(3).unwrap();
        let seat = arbiter.try_acquire_seat(WorkerId::new(0)).unwrap().unwrap();
        let resource = arbiter
            .try_acquire_resource(&seat, ResourceId::new(0))
            .unwrap()
            .unwrap();
        std::mem::forget(resource);
        std::mem::forget(seat);

        let err = check_conservation(&arbiter.snapshot().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            Error::Arbiter(ArbiterError::InvariantViolated { .. })
        ));
    }

    #[test]
    fn unreleased_state_is_reported_on_the_run_stream() {
        let arbiter = Arbiter::new(2).unwrap();
        std::mem::forget(arbiter.try_acquire_seat(WorkerId::new(1)).unwrap().unwrap());
        let violation = check_conservation(&arbiter.snapshot().unwrap()).unwrap_err();

        let (tx, mut rx) = seatring_events::channel();
        report_unreleased(Some(&tx), "run-7", &violation);

        let message = rx.try_recv().unwrap();
        assert_eq!(message.meta.correlation_id.as_deref(), Some("run-7"));
        match message.event {
            AppEvent::General(GeneralEvent::Error { message, details }) => {
                assert_eq!(message, "arbiter not idle after failed run");
                assert!(details.contains("1 seats and 0 resources"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn conservation_holds_on_an_idle_arbiter() {
        let arbiter = Arbiter::new(4).unwrap();
        check_conservation(&arbiter.snapshot().unwrap()).unwrap();
    }
}
