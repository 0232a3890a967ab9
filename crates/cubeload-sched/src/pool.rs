//! Fixed-size worker pool fed through a crossbeam channel.
//!
//! Workers loop on `recv()` until the job channel is closed, so shutdown is
//! just dropping the sender and joining. A pool with zero workers runs each
//! job inline on the submitting thread, which keeps tests deterministic.

use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use tracing::debug;

use crate::error::SchedError;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum PoolState {
    Inline,
    Threads(Sender<Job>),
    Stopped,
}

/// Runs submitted jobs on background threads.
pub struct WorkerPool {
    state: PoolState,
    workers: Vec<JoinHandle<()>>,
    worker_count: usize,
}

impl WorkerPool {
    /// Spawn `worker_count` threads named `cubeload-worker-{i}`.
    ///
    /// `0` creates an inline pool with no threads.
    pub fn new(worker_count: usize) -> Result<Self, SchedError> {
        if worker_count == 0 {
            debug!("worker pool running inline");
            return Ok(Self {
                state: PoolState::Inline,
                workers: Vec::new(),
                worker_count,
            });
        }

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let job_rx = job_rx.clone();
            let spawned = thread::Builder::new()
                .name(format!("cubeload-worker-{i}"))
                .spawn(move || {
                    while let Ok(job) = job_rx.recv() {
                        job();
                    }
                    // Channel closed: exit cleanly.
                });
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Unwind the threads already started.
                    drop(job_tx);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(SchedError::ThreadSpawnFailed {
                        reason: e.to_string(),
                    });
                }
            }
        }
        debug!(worker_count, "worker pool started");
        Ok(Self {
            state: PoolState::Threads(job_tx),
            workers,
            worker_count,
        })
    }

    /// Submit a job.
    pub fn execute<F>(&self, job: F) -> Result<(), SchedError>
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.state {
            PoolState::Inline => {
                job();
                Ok(())
            }
            PoolState::Threads(tx) => tx.send(Box::new(job)).map_err(|_| SchedError::Shutdown),
            PoolState::Stopped => Err(SchedError::Shutdown),
        }
    }

    /// Configured number of threads (0 for inline).
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// `true` when jobs run on the submitting thread.
    pub fn is_inline(&self) -> bool {
        matches!(self.state, PoolState::Inline)
    }

    /// `true` after [`shutdown`](Self::shutdown).
    pub fn is_shut_down(&self) -> bool {
        matches!(self.state, PoolState::Stopped)
    }

    /// Stop accepting work, let queued jobs finish, and join every thread.
    ///
    /// Returns the number of threads joined cleanly. Idempotent.
    pub fn shutdown(&mut self) -> usize {
        if self.is_shut_down() {
            return 0;
        }
        // Dropping the sender closes the channel once the queue drains.
        self.state = PoolState::Stopped;
        let mut joined = 0;
        for handle in self.workers.drain(..) {
            if handle.join().is_ok() {
                joined += 1;
            }
        }
        debug!(joined, "worker pool shut down");
        joined
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.worker_count)
            .field("inline", &self.is_inline())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
