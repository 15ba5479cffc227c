//! Bounded worker pool for decoding several input files.
//!
//! Each unit is processed independently; failures (panics included) are
//! collected and returned alongside the successes instead of stopping the
//! batch.

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use thiserror::Error;
use tracing::{debug, error};

/// A unit whose work panicked or left no result.
#[derive(Debug, Error)]
#[error("processing panicked: {message}")]
pub struct UnitPanic {
    pub message: String,
}

impl UnitPanic {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self { message }
    }
}

/// Outcome of one unit of a batch.
#[derive(Debug)]
pub struct UnitOutcome<T, R, E> {
    pub unit: T,
    pub result: Result<R, E>,
}

/// Results of a batch in input order.
#[derive(Debug)]
pub struct BatchReport<T, R, E> {
    pub outcomes: Vec<UnitOutcome<T, R, E>>,
}

impl<T, R, E> BatchReport<T, R, E> {
    pub fn failures(&self) -> impl Iterator<Item = (&T, &E)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|err| (&outcome.unit, err)))
    }

    pub fn successes(&self) -> impl Iterator<Item = (&T, &R)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok().map(|ok| (&outcome.unit, ok)))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Number of workers for `requested` jobs over `units` inputs.
pub fn worker_count(requested: Option<NonZeroUsize>, units: usize) -> usize {
    let requested = requested
        .or_else(|| thread::available_parallelism().ok())
        .map_or(1, NonZeroUsize::get);
    requested.min(units).max(1)
}

/// Runs `work` over `units` on at most `jobs` scoped threads.
///
/// Outcomes keep the order of `units`. A panicking unit is reported as a
/// [`UnitPanic`] failure.
pub fn run_batch<T, R, E, F>(units: Vec<T>, jobs: Option<NonZeroUsize>, work: F) -> BatchReport<T, R, E>
where
    T: Sync,
    R: Send,
    E: Send + From<UnitPanic>,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    let workers = worker_count(jobs, units.len());
    debug!(units = units.len(), workers, "starting batch");

    let next = AtomicUsize::new(0);
    let slots: Vec<Mutex<Option<Result<R, E>>>> =
        units.iter().map(|_| Mutex::new(None)).collect();

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(unit) = units.get(index) else {
                        break;
                    };
                    let result = panic::catch_unwind(AssertUnwindSafe(|| work(unit)))
                        .unwrap_or_else(|payload| {
                            let failure = UnitPanic::from_payload(payload.as_ref());
                            error!(unit = index, "{failure}");
                            Err(E::from(failure))
                        });
                    *slots[index].lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
                }
            });
        }
    });

    let outcomes = units
        .into_iter()
        .zip(slots)
        .map(|(unit, slot)| {
            let result = slot
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .unwrap_or_else(|| {
                    Err(E::from(UnitPanic {
                        message: "no result recorded".to_string(),
                    }))
                });
            UnitOutcome { unit, result }
        })
        .collect();
    BatchReport { outcomes }
}
