//! Bounded-concurrency folder dispatch
//!
//! Replaces the original tool's `fork()` + POSIX semaphore pool with a
//! `tokio::sync::Semaphore`-gated task pool. Each accepted task runs on the
//! blocking thread pool (`spawn_blocking`, since folder processing is
//! synchronous file and archive I/O) and is tracked in a `JoinSet` so the
//! supervisor can wait for every outstanding task and propagate the first
//! failure.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::errors::{AppError, AppResult};

/// What the caller should do with a unit of work after asking the supervisor
/// whether a worker slot is available.
///
/// Resolves the ambiguity in the original tool's `try_fork`, whose return
/// value meant different things to the parent and the child process.
#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    /// A slot was available; the work has been handed to a pooled task.
    Dispatched,
    /// No slot was available (or the pool is saturated); the caller should
    /// run the work inline, on its own task.
    InlineSelf,
}

/// Bounds how many folder subtrees are processed concurrently and collects
/// their results.
pub struct Supervisor {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<AppResult<()>>,
}

impl Supervisor {
    /// `semaphore` is the process-wide worker-slot pool, constructed once in
    /// `walker::run` and cloned into every `Supervisor` so the configured
    /// concurrency cap bounds in-flight workers across the whole tree, not
    /// just within one folder's children.
    pub fn new(semaphore: Arc<Semaphore>) -> Self {
        Self { semaphore, tasks: JoinSet::new() }
    }

    /// Try to acquire a worker slot for `label` (used only for tracing) and
    /// either dispatch `work` onto the blocking pool or report that the
    /// caller must run it inline.
    ///
    /// `work` must be `'static` and panic-safe: the `OwnedSemaphorePermit`
    /// is dropped (releasing the slot) on every exit path, including panics,
    /// because it is held across the `spawn_blocking` future by RAII.
    pub fn try_dispatch<F>(&mut self, label: &str, work: F) -> Decision
    where
        F: FnOnce() -> AppResult<()> + Send + 'static,
    {
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => {
                tracing::debug!(folder = label, "dispatched to worker pool");
                self.tasks.spawn_blocking(move || {
                    let _permit = permit;
                    work()
                });
                Decision::Dispatched
            }
            Err(_) => {
                tracing::debug!(folder = label, "pool saturated, running inline");
                Decision::InlineSelf
            }
        }
    }

    /// Wait for every dispatched task, returning the first error encountered
    /// (if any). A panicking task is reported as [`AppError::WorkerFailed`].
    pub async fn join_all(&mut self) -> AppResult<()> {
        let mut first_error = None;
        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) if first_error.is_none() => first_error = Some(e),
                Ok(Err(_)) => {}
                Err(join_err) if first_error.is_none() => {
                    first_error = Some(AppError::WorkerFailed(join_err.to_string()));
                }
                Err(_) => {}
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatches_while_slots_available() {
        let mut sup = Supervisor::new(Arc::new(Semaphore::new(2)));
        let d1 = sup.try_dispatch("a", || Ok(()));
        let d2 = sup.try_dispatch("b", || Ok(()));
        assert_eq!(d1, Decision::Dispatched);
        assert_eq!(d2, Decision::Dispatched);
        sup.join_all().await.unwrap();
    }

    #[tokio::test]
    async fn reports_inline_when_saturated() {
        let mut sup = Supervisor::new(Arc::new(Semaphore::new(1)));
        // Acquire the one slot with a task that blocks until we tell it to finish.
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let d1 = sup.try_dispatch("a", move || {
            rx.recv().ok();
            Ok(())
        });
        let d2 = sup.try_dispatch("b", || Ok(()));
        assert_eq!(d1, Decision::Dispatched);
        assert_eq!(d2, Decision::InlineSelf);
        tx.send(()).unwrap();
        sup.join_all().await.unwrap();
    }

    #[tokio::test]
    async fn propagates_first_worker_error() {
        let mut sup = Supervisor::new(Arc::new(Semaphore::new(2)));
        sup.try_dispatch("a", || Err(AppError::Filesystem("boom".into())));
        let result = sup.join_all().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn shared_semaphore_bounds_dispatch_across_two_supervisors() {
        let semaphore = Arc::new(Semaphore::new(1));
        let mut parent = Supervisor::new(semaphore.clone());
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let d1 = parent.try_dispatch("a", move || {
            rx.recv().ok();
            Ok(())
        });
        assert_eq!(d1, Decision::Dispatched);

        // A second, independently-constructed supervisor sharing the same
        // semaphore sees no free slot, since the cap is process-wide.
        let mut child = Supervisor::new(semaphore.clone());
        let d2 = child.try_dispatch("b", || Ok(()));
        assert_eq!(d2, Decision::InlineSelf);

        tx.send(()).unwrap();
        parent.join_all().await.unwrap();
        child.join_all().await.unwrap();
    }
}
