//! Fleet-wide fan-out/fan-in execution.
//!
//! Every lifecycle phase applies the same operation to every host of a
//! fleet concurrently: one tokio task per host, no concurrency cap, and a
//! hard barrier join. The barrier is what guarantees happens-after
//! ordering between phases (run before download, download before
//! aggregation); nothing in this crate orders phases by timing.
//!
//! [`run_all`] returns one [`TaskOutcome`] per host. A failure inside a
//! task is never lost: it comes back as that host's outcome, and the
//! caller decides whether a partial failure is acceptable for the phase
//! at hand.

use futures::future::join_all;
use std::future::Future;
use tracing::{error, info, warn};

use crate::connection::{Fleet, Host};
use crate::error::{Error, Result};

/// The terminal state of one per-host task.
#[derive(Debug)]
pub struct TaskOutcome<T> {
    /// Address of the host the task ran against.
    pub host: String,
    /// Success value or the typed error that ended the task.
    pub result: Result<T>,
}

impl<T> TaskOutcome<T> {
    /// True if the task succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs `op` against every host of the fleet concurrently and blocks until
/// every task reaches a terminal state. Returns exactly one outcome per
/// host, in fleet order. A panicking task surfaces as [`Error::Internal`]
/// in its outcome.
pub async fn run_all<T, F, Fut>(fleet: &Fleet, op: F) -> Vec<TaskOutcome<T>>
where
    T: Send + 'static,
    F: Fn(Host) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let mut hosts = Vec::with_capacity(fleet.len());
    let mut handles = Vec::with_capacity(fleet.len());
    for host in fleet.iter() {
        hosts.push(host.address.clone());
        handles.push(tokio::spawn(op(host.clone())));
    }

    let joined = join_all(handles).await;
    hosts
        .into_iter()
        .zip(joined)
        .map(|(host, joined)| {
            let result = match joined {
                Ok(result) => result,
                Err(e) => Err(Error::Internal(format!(
                    "task for host '{host}' did not finish: {e}"
                ))),
            };
            TaskOutcome { host, result }
        })
        .collect()
}

/// Logs which hosts succeeded and which failed for a phase; returns the
/// number of failures. Used by the log-and-continue phases
/// (install/prepare/download). Host-local failures (one unreachable or
/// misbehaving machine) log at warn; anything else means the
/// orchestration itself is broken and logs at error.
pub fn log_outcomes<T>(phase: &str, outcomes: &[TaskOutcome<T>]) -> usize {
    let mut failures = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(_) => info!(phase, host = %outcome.host, "done"),
            Err(e) => {
                failures += 1;
                if e.is_host_local() {
                    warn!(phase, host = %outcome.host, error = %e, "failed");
                } else {
                    error!(phase, host = %outcome.host, error = %e, "failed");
                }
            }
        }
    }
    failures
}

/// Strict policy for phases where a partial result invalidates the run:
/// logs every outcome, then returns the first failure as an error. On
/// success yields the per-host values in fleet order.
pub fn require_all<T>(phase: &str, outcomes: Vec<TaskOutcome<T>>) -> Result<Vec<T>> {
    log_outcomes(phase, &outcomes);
    let mut values = Vec::with_capacity(outcomes.len());
    let mut first_failure = None;
    for outcome in outcomes {
        match outcome.result {
            Ok(value) => values.push(value),
            Err(e) => {
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }
    }
    match first_failure {
        Some(e) => Err(e),
        None => Ok(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fleet(n: usize) -> Fleet {
        Fleet::from_addresses(
            (0..n).map(|i| format!("10.0.0.{i}")),
            "user",
            "",
        )
    }

    #[tokio::test]
    async fn one_outcome_per_host_in_fleet_order() {
        let outcomes = run_all(&fleet(4), |host| async move { Ok(host.address) }).await;
        assert_eq!(outcomes.len(), 4);
        let hosts: Vec<_> = outcomes.iter().map(|o| o.host.clone()).collect();
        assert_eq!(hosts, vec!["10.0.0.0", "10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert!(outcomes.iter().all(TaskOutcome::is_ok));
    }

    #[tokio::test]
    async fn failures_are_collected_not_swallowed() {
        let outcomes = run_all(&fleet(3), |host| async move {
            if host.address.ends_with('1') {
                Err(Error::remote_command(&host.address, 2, "fio"))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        assert!(outcomes[2].is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(Error::RemoteCommand { exit_code: 2, .. })
        ));
    }

    #[tokio::test]
    async fn barrier_waits_for_every_task() {
        let finished = Arc::new(AtomicUsize::new(0));
        let outcomes = run_all(&fleet(8), {
            let finished = finished.clone();
            move |host| {
                let finished = finished.clone();
                async move {
                    // Vary completion order.
                    let delay = host.address.bytes().last().unwrap_or(0) as u64 % 5;
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(outcomes.len(), 8);
        assert_eq!(finished.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn panic_in_one_task_becomes_its_outcome() {
        let outcomes = run_all(&fleet(2), |host| async move {
            if host.address.ends_with('0') {
                panic!("boom");
            }
            Ok(())
        })
        .await;

        assert!(matches!(outcomes[0].result, Err(Error::Internal(_))));
        assert!(outcomes[1].is_ok());
    }

    #[tokio::test]
    async fn require_all_returns_first_failure() {
        let outcomes = run_all(&fleet(3), |host| async move {
            if host.address.ends_with('2') {
                Err(Error::transfer(&host.address, "scp exited 1"))
            } else {
                Ok(host.address)
            }
        })
        .await;

        let err = require_all("run", outcomes).unwrap_err();
        assert!(matches!(err, Error::Transfer { .. }));
    }

    #[tokio::test]
    async fn log_outcomes_counts_failures() {
        let outcomes = run_all(&fleet(3), |host| async move {
            if host.address.ends_with('0') {
                Ok(())
            } else {
                Err(Error::transfer(&host.address, "nope"))
            }
        })
        .await;
        assert_eq!(log_outcomes("download", &outcomes), 2);
    }

    #[tokio::test]
    async fn log_outcomes_counts_host_local_and_systemic_failures_alike() {
        // one unreachable host, one internal failure; both must be counted
        let outcomes = run_all(&fleet(3), |host| async move {
            match host.address.bytes().last() {
                Some(b'0') => Err(Error::transfer(&host.address, "scp exited 1")),
                Some(b'1') => Err(Error::Internal("task lost".to_string())),
                _ => Ok(()),
            }
        })
        .await;
        assert!(outcomes[0].result.as_ref().is_err_and(Error::is_host_local));
        assert!(!outcomes[1].result.as_ref().unwrap_err().is_host_local());
        assert_eq!(log_outcomes("install", &outcomes), 2);
    }
}
