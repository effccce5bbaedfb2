//! Dynamic fan-out of an index range across a fixed worker pool.
//!
//! Workers share one atomic cursor over `[start, end)` and claim the next
//! index with `fetch_add`, so fast workers take more of the range. Nothing is
//! guaranteed about the order in which indices run.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use rayon::ThreadPoolBuilder;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::error::{ErrorKind, define_error_codes};

/// Errors raised by the parallel executor.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ParallelError {
    /// At least one worker is required.
    #[error("parallel execution requires at least one thread")]
    ZeroThreads,
    /// The worker pool could not be started.
    #[error("failed to start worker pool: {message}")]
    PoolBuild {
        /// Message reported by the thread pool builder.
        message: String,
    },
}

define_error_codes! {
    /// Stable codes describing [`ParallelError`] variants.
    enum ParallelErrorCode for ParallelError {
        /// Zero worker threads requested.
        ZeroThreads => ZeroThreads => "PARALLEL_ZERO_THREADS",
        /// Worker pool failed to start.
        PoolBuild => PoolBuild { .. } => "PARALLEL_POOL_BUILD",
    }
}

impl ParallelError {
    /// Classifies the error within the shared taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroThreads => ErrorKind::InvalidArgument,
            Self::PoolBuild { .. } => ErrorKind::ResourceExhausted,
        }
    }
}

/// Runs `f` once for every index in `start..end` on `num_threads` workers.
///
/// Returns once every index has been processed. An empty range starts no
/// workers.
///
/// # Errors
/// Returns [`ParallelError::ZeroThreads`] before any work runs when
/// `num_threads` is zero, or [`ParallelError::PoolBuild`] when the pool
/// cannot be created.
///
/// # Examples
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use flatnav_core::execute_in_parallel;
///
/// let total = AtomicUsize::new(0);
/// execute_in_parallel(0, 10, 4, |i| {
///     total.fetch_add(i, Ordering::Relaxed);
/// })
/// .expect("four workers");
/// assert_eq!(total.into_inner(), 45);
/// ```
pub fn execute_in_parallel<F>(
    start: usize,
    end: usize,
    num_threads: usize,
    f: F,
) -> Result<(), ParallelError>
where
    F: Fn(usize) + Sync,
{
    try_execute_in_parallel::<_, ParallelError>(start, end, num_threads, |index| {
        f(index);
        Ok(())
    })
}

/// Fallible variant of [`execute_in_parallel`].
///
/// A failing index does not cancel the others: workers keep draining the
/// range and the first error recorded is returned once all have finished.
///
/// # Errors
/// Returns the executor's own errors converted into `E`, or the first error
/// produced by `f`.
#[instrument(name = "parallel.execute", skip(f), err)]
pub fn try_execute_in_parallel<F, E>(
    start: usize,
    end: usize,
    num_threads: usize,
    f: F,
) -> Result<(), E>
where
    F: Fn(usize) -> Result<(), E> + Sync,
    E: From<ParallelError> + Send + std::fmt::Display,
{
    if num_threads == 0 {
        return Err(ParallelError::ZeroThreads.into());
    }
    if start >= end {
        return Ok(());
    }

    let workers = num_threads.min(end - start);
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("flatnav-worker-{i}"))
        .build()
        .map_err(|err| ParallelError::PoolBuild {
            message: err.to_string(),
        })?;

    let cursor = AtomicUsize::new(start);
    let first_error: Mutex<Option<E>> = Mutex::new(None);
    pool.broadcast(|_| {
        loop {
            let index = cursor.fetch_add(1, Ordering::Relaxed);
            if index >= end {
                break;
            }
            if let Err(err) = f(index) {
                let mut slot = first_error.lock().expect("error slot lock poisoned");
                if slot.is_none() {
                    *slot = Some(err);
                }
            }
        }
    });
    debug!(workers, items = end - start, "parallel range drained");

    match first_error
        .into_inner()
        .expect("error slot lock poisoned")
    {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Mutex as StdMutex};

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(8)]
    fn visits_every_index_exactly_once(#[case] threads: usize) {
        let seen = StdMutex::new(Vec::new());
        execute_in_parallel(3, 103, threads, |i| {
            seen.lock().expect("lock").push(i);
        })
        .expect("execution succeeds");
        let mut seen = seen.into_inner().expect("lock");
        seen.sort_unstable();
        assert_eq!(seen, (3..103).collect::<Vec<_>>());
    }

    #[test]
    fn zero_threads_fail_before_any_work() {
        let calls = AtomicUsize::new(0);
        let err = execute_in_parallel(0, 10, 0, |_| {
            calls.fetch_add(1, Ordering::Relaxed);
        })
        .expect_err("zero threads");
        assert_eq!(err, ParallelError::ZeroThreads);
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn empty_range_is_a_no_op() {
        execute_in_parallel(5, 5, 4, |_| panic!("no index to run")).expect("empty range");
    }

    #[derive(Debug, Error)]
    enum Failure {
        #[error("index {0} failed")]
        Index(usize),
        #[error(transparent)]
        Parallel(#[from] ParallelError),
    }

    #[test]
    fn failures_do_not_cancel_remaining_work() {
        let seen = StdMutex::new(HashSet::new());
        let err = try_execute_in_parallel(0, 50, 3, |i| {
            seen.lock().expect("lock").insert(i);
            if i == 7 { Err(Failure::Index(i)) } else { Ok(()) }
        })
        .expect_err("index 7 fails");
        assert!(matches!(err, Failure::Index(7)));
        assert_eq!(seen.into_inner().expect("lock").len(), 50);
    }
}
