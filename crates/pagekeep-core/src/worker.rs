//! A small fixed-size pool of background threads.
//!
//! Jobs are boxed closures pulled from one shared `crossbeam-channel` queue;
//! every worker holds a clone of its receiver. Each submission returns a
//! [`TaskHandle`] backed by a one-slot channel. A panicking job is contained:
//! its handle reports [`StoreError::WorkerGone`] and the worker keeps serving
//! the queue.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{ErrorCode, StoreError};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    queue: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `threads` workers (at least one).
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn a thread.
    pub fn new(threads: usize) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let workers = (0..threads.max(1))
            .map(|index| {
                let rx = rx.clone();
                thread::Builder::new()
                    .name(format!("pagekeep-worker-{index}"))
                    .spawn(move || run_worker(index, &rx))
            })
            .collect::<std::io::Result<Vec<_>>>()?;
        debug!(threads = workers.len(), "worker pool started");
        Ok(Self {
            queue: Some(tx),
            workers,
        })
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Queue `job`; its result is delivered through the returned handle.
    pub fn submit<R, F>(&self, job: F) -> TaskHandle<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        if let Some(queue) = &self.queue {
            let boxed: Job = Box::new(move || {
                // The receiver may already be gone; the result is then unwanted.
                let _ = tx.send(job());
            });
            if queue.send(boxed).is_err() {
                debug!("worker queue closed; task dropped");
            }
        }
        TaskHandle { rx }
    }
}

fn run_worker(index: usize, rx: &Receiver<Job>) {
    for job in rx {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(
                worker = index,
                code = ErrorCode::InternalUnexpected.code(),
                "background task panicked"
            );
        }
    }
    debug!(worker = index, "worker stopped");
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        drop(self.queue.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("worker thread exited abnormally");
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.workers.len())
            .finish_non_exhaustive()
    }
}

/// The pending result of a submitted job.
#[derive(Debug)]
pub struct TaskHandle<R> {
    rx: Receiver<R>,
}

impl<R> TaskHandle<R> {
    /// Block until the job finishes.
    ///
    /// # Errors
    ///
    /// [`StoreError::WorkerGone`] if the job panicked or never ran.
    pub fn wait(self) -> Result<R, StoreError> {
        self.rx.recv().map_err(|_| StoreError::WorkerGone)
    }

    /// Block for at most `timeout`; `Ok(None)` when it elapsed.
    ///
    /// # Errors
    ///
    /// [`StoreError::WorkerGone`] if the job panicked or never ran.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<R>, StoreError> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Ok(Some(value)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(StoreError::WorkerGone),
        }
    }

    /// Non-blocking poll.
    ///
    /// # Errors
    ///
    /// [`StoreError::WorkerGone`] if the job panicked or never ran.
    pub fn try_get(&self) -> Result<Option<R>, StoreError> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(StoreError::WorkerGone),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn results_come_back_through_handles() {
        let pool = WorkerPool::new(2).expect("pool");
        let handles: Vec<_> = (0..8).map(|n| pool.submit(move || n * n)).collect();
        let results: Vec<i32> = handles
            .into_iter()
            .map(|handle| handle.wait().expect("result"))
            .collect();
        assert_eq!(results, [0, 1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn panicking_job_reports_worker_gone_and_pool_survives() {
        let pool = WorkerPool::new(1).expect("pool");
        let bad = pool.submit(|| -> u8 { panic!("boom") });
        assert!(matches!(bad.wait(), Err(StoreError::WorkerGone)));

        let good = pool.submit(|| 7_u8);
        assert_eq!(good.wait().expect("result"), 7);
    }

    #[test]
    fn drop_runs_queued_jobs_then_joins() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(0).expect("pool");
            assert_eq!(pool.threads(), 1);
            for _ in 0..5 {
                let counter = Arc::clone(&counter);
                let _ = pool.submit(move || counter.fetch_add(1, Ordering::SeqCst));
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn polling_before_completion_is_empty() {
        let pool = WorkerPool::new(1).expect("pool");
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(1);
        let handle = pool.submit(move || gate_rx.recv().is_ok());
        assert!(matches!(handle.try_get(), Ok(None)));
        gate_tx.send(()).expect("gate");
        assert_eq!(handle.wait_timeout(Duration::from_secs(5)).expect("ok"), Some(true));
    }

    #[test]
    fn workers_pull_from_the_shared_queue_concurrently() {
        let pool = WorkerPool::new(2).expect("pool");
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(1);
        let waiter = pool.submit(move || gate_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        let opener = pool.submit(move || gate_tx.send(()).is_ok());
        assert!(opener.wait().expect("opener"));
        assert!(waiter.wait().expect("waiter"));
    }
}
