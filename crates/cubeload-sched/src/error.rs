//! Runtime errors from the worker pool.

use thiserror::Error;

/// Errors from starting or feeding a [`WorkerPool`](crate::WorkerPool).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchedError {
    /// The pool was shut down and accepts no more work.
    #[error("worker pool is shut down")]
    Shutdown,
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {reason}")]
    ThreadSpawnFailed {
        /// The OS error message.
        reason: String,
    },
}
